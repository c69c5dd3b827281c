mod args;
mod calling;
mod convert;
mod vm;

pub use args::{arg, check_args, fill_defaults, lua_type_name, ArgKind, ArgSpec};
pub use calling::{into_returns, CallSite, ResultView, Returns};
pub use convert::{LuaConverter, DEFAULT_MAX_DEPTH};
pub use vm::ScriptHost;
