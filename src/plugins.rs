//! 内置插件

pub mod yulu;

pub use yulu::YuluPlugin;
