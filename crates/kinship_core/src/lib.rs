pub mod api;
pub mod error;
pub mod facet;
pub mod filter;
pub mod ids;
pub mod model;
pub mod params;
pub mod predicate;
pub mod property;
pub mod query;
pub mod value;
pub mod visibility;

pub use api::*;
pub use error::{KinshipError, KinshipResult};
pub use facet::*;
pub use filter::*;
pub use ids::*;
pub use model::*;
pub use params::*;
pub use predicate::*;
pub use property::*;
pub use query::*;
pub use value::*;
pub use visibility::*;
