pub mod path;
pub mod value;
pub mod store;
pub mod errors;
pub mod tree;


pub use path::{Path, PathError};
pub use value::Value;
pub use store::RemoteStore;
pub use errors::{BoxError, DatabaseError, StoreError};
