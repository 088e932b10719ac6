pub mod frame;
pub mod simulator;

pub use frame::{FrameDescriptor, OwnedFrame, SampleFormat};
pub use simulator::{FrameSimulator, SimulatorHandle, SourceSummary};
