pub mod arena;
pub mod code;
pub mod error;
pub mod install;
pub mod mem;
pub mod methods;
pub mod platform;
pub mod runtime;

pub use arena::{Address, CodeArena};
pub use code::{
    Code, CodeId, CodeKind, CodeObjects, CommentTable, DataImage, InfopointEntry, InfopointTable,
    MarkTable, OopMap, OopMapTable, CODE_ALIGNMENT,
};
pub use error::{InstallError, Result};
pub use install::{install_code, CodeInstaller};
pub use methods::MethodTable;
pub use platform::Platform;
pub use runtime::{ClassTable, ConstantResolver, ObjectTable, Runtime};
