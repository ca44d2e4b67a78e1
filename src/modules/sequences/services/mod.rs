mod sequence_allocator;

pub use sequence_allocator::{SequenceAllocator, UnconfirmedNumber};
