mod assembler;
mod codec;
mod frame;
mod frame_type;
mod payload;

pub use assembler::{FrameAssembler, ReadOutcome};
pub use codec::{recv_frame, send_frame, DecodeOutcome};
pub use frame::{CodecError, Frame, DATA_SIZE, FRAME_SIZE};
pub use frame_type::FrameType;
pub use payload::{join, split};
