pub mod aiml;
pub mod aux_files;
pub mod category;
pub mod error;
pub mod knowledge_base;
pub mod pattern;
pub mod template_ast;
pub mod xml;

pub use aiml::{category_to_xml, load_aiml, node_to_xml, parse_learned_categories};
pub use category::{Category, CategoryOrigin};
pub use error::GolemKbError;
pub use knowledge_base::KnowledgeBase;
pub use template_ast::TemplateNode;
