pub mod openai;
pub mod traits;
pub mod util;

pub use openai::OpenAi;
pub use traits::{ChatAgent, Message, MessageRole};
pub use util::truncate_to_char_boundary;
