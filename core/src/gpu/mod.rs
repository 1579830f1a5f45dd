pub use self::backend::*;
pub use self::barrier::*;
pub use self::command::*;
pub use self::debug::*;
pub use self::descriptor::*;
pub use self::device::*;
pub use self::error::*;
pub use self::format::*;
pub use self::handle::*;
pub use self::pipeline::*;
pub use self::query::*;
pub use self::queue::*;
pub use self::resource::*;
pub use self::states::*;
pub use self::swapchain::*;
pub use self::sync::*;

mod backend;
mod barrier;
mod command;
mod debug;
mod descriptor;
mod device;
mod error;
mod format;
mod handle;
mod pipeline;
mod query;
mod queue;
mod resource;
mod states;
mod swapchain;
mod sync;
