pub(crate) mod bootstrap;
pub(crate) mod catalog;
pub(crate) mod commands;
pub(crate) mod headless_ui;
pub(crate) mod loop_runner;
pub(crate) mod session;
