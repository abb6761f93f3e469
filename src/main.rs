// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod acquisition;
mod buffer;
mod config;
mod drivers;
mod gui;
mod plot;
mod recorder;
mod timer;
mod types;
use anyhow::{anyhow, Context, Result};
use eframe::egui;
use log::info;
use crate::config::AppConfig;
use crate::drivers::{open_multimeter, InstrumentSource, SyntheticSource};
use crate::types::SourceKind;
fn open_source(config: &AppConfig) -> Result<Box<dyn InstrumentSource>> {
    match config.source {
        SourceKind::Synthetic => {
            info!("Instrument info: Dummy");
            Ok(Box::new(SyntheticSource::new()))
        }
        SourceKind::Hardware => open_multimeter(&config.resource, config.serial())
            .with_context(|| format!("cannot connect to multimeter {}", config.resource)),
    }
}
// 入口函数
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = AppConfig::load()?;
    let source = open_source(&config)?;
    let app = gui::VoltageReaderApp::new(source, &config)?;
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([925.0, 500.0])
        .with_min_inner_size([700.0, 400.0])
        .with_title("Voltage Reader");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "Voltage Reader",
        options,
        Box::new(move |_cc| Box::new(app)),
    )
    .map_err(|e| anyhow!("GUI failed: {e}"))
}
