#[macro_use]
extern crate bitflags;

pub use self::barriers::*;
pub use self::batch::*;
pub use self::builders::*;
pub use self::error::*;
pub use self::executor::*;
pub use self::graph::*;
pub use self::identifier::*;
pub use self::immediate::*;
pub use self::params::*;
pub use self::pass::*;
pub use self::range::*;
pub use self::recording::*;
pub use self::registry::*;
pub use self::resource::*;
pub use self::stats::*;
pub use self::tracker::*;

mod barriers;
mod batch;
mod builders;
mod error;
mod executor;
mod graph;
mod identifier;
mod immediate;
mod params;
mod pass;
mod range;
mod recording;
mod registry;
mod resource;
mod stats;
mod tracker;
