//! GUIモジュール - eframe/egui による画面

mod app;
mod theme;

pub use app::{run, PaperRenamerApp};
