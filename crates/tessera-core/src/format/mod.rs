pub mod crop;
pub mod template;

pub use crop::{CROP_PLACEHOLDER, TemplateCrop};
pub use template::{ChatTemplates, TemplateSource};
