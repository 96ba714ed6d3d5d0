pub mod descriptor;
pub mod finger_table;
pub mod identifier;
pub mod state;

pub use descriptor::NodeDescriptor;
pub use identifier::Identifier;
pub use state::{GetInfoResult, Node};
