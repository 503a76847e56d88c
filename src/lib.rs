pub mod proto {
    pub mod tensorflow {
        include!("tensorflow.pb.rs");
    }
}

pub mod error;
pub mod inspect;
pub mod masked_crc;
pub mod meta_graph;
pub mod reader;
pub mod saver;
pub mod shape;
pub mod state;
pub mod table;
pub mod tensor;
pub mod variable;
pub mod writer;

pub use error::{Error, Result};
pub use reader::CheckpointReader;
pub use saver::{Saver, SaverOptions};
pub use tensor::{DataType, Tensor, TensorElement};
pub use variable::Variable;
