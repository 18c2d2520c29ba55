//! UI layer for desktop GUI: app shell, panels, widgets, chart and theme.

pub mod app;
pub mod chart;
pub mod panels;
pub mod theme;
pub mod widgets;

pub use app::DetectorApp;
