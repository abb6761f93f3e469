// src/gui.rs
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, Instant};

use eframe::egui;
use egui::Color32;
use egui_plot::{Line, Plot, PlotPoints, Points};

use crate::acquisition::{AcquisitionError, AcquisitionLoop, StartRequest};
use crate::config::AppConfig;
use crate::drivers::InstrumentSource;
use crate::plot::{save_readings_png, snapshot_path, PlotStyle};
use crate::types::{LoopEvent, PollInterval};

const LOG_LINES: usize = 8;

pub struct VoltageReaderApp {
    daq: AcquisitionLoop<Box<dyn InstrumentSource>>,
    rx: Receiver<LoopEvent>,

    // 输入控件
    output_text: String,
    interval: PollInterval,
    inputs_locked: bool,

    // 状态栏与日志
    instrument: String,
    status: String,
    log_messages: Vec<String>,
}

impl VoltageReaderApp {
    pub fn new(
        source: Box<dyn InstrumentSource>,
        config: &AppConfig,
    ) -> Result<Self, AcquisitionError> {
        let (tx, rx) = channel();
        let mut daq = AcquisitionLoop::new(source, config.buffer_capacity, tx);
        daq.configure(config.max_range, config.resolution)?;
        let instrument = daq.source().describe();
        Ok(Self {
            daq,
            rx,
            output_text: String::new(),
            interval: config.default_interval,
            inputs_locked: false,
            status: "Ready".to_owned(),
            log_messages: vec![format!("Instrument: {instrument}")],
            instrument,
        })
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > LOG_LINES {
            self.log_messages.remove(0);
        }
    }

    fn toggle(&mut self) {
        if self.daq.is_running() {
            self.daq.stop();
            return;
        }
        let request = StartRequest {
            output: Some(PathBuf::from(self.output_text.trim())),
            interval: Some(self.interval),
        };
        match self.daq.start(request) {
            Ok(outcome) if outcome.already_running => self.log("Already running"),
            Ok(_) => {}
            Err(e) => {
                self.status = e.to_string();
                self.log(&format!("Start failed: {e}"));
            }
        }
    }

    fn save_plot(&mut self) {
        let target = match self.daq.session() {
            Some(session) => snapshot_path(session.output()),
            None => {
                let output = self.output_text.trim();
                snapshot_path((!output.is_empty()).then(|| Path::new(output)))
            }
        };
        match save_readings_png(self.daq.readings(), &PlotStyle::default(), &target) {
            Ok(path) => {
                self.status = format!("Plot saved to {}", path.display());
                self.log(&format!("Plot saved: {}", path.display()));
            }
            Err(e) => {
                self.status = e.to_string();
                self.log(&e.to_string());
            }
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                LoopEvent::Started { output, interval } => {
                    match output {
                        Some(path) => {
                            // 文件名可能被加了 _1 后缀，回写到输入框
                            self.output_text = path.display().to_string();
                            self.log(&format!("Writing {} every {interval}", self.output_text));
                        }
                        None => self.log(&format!("No output file, every {interval}")),
                    }
                    self.status = "Started".to_owned();
                }
                LoopEvent::Reading(r) => {
                    self.status = format!("T= {:.6} V = {:.6}", r.elapsed, r.value);
                }
                LoopEvent::Stopped => {
                    self.status = "Stopped".to_owned();
                    self.log("Acquisition stopped");
                }
                LoopEvent::InputsLocked(locked) => self.inputs_locked = locked,
                LoopEvent::Error(msg) => {
                    self.log(&format!("Error: {msg}"));
                    self.status = msg;
                }
            }
        }
    }
}

impl eframe::App for VoltageReaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. 定时采样 (错误会通过 LoopEvent::Error 送回来)
        let now = Instant::now();
        self.daq.poll(now).ok();

        // 2. 消息处理
        self.drain_events();
        if let Some(wait) = self.daq.time_until_next_tick(Instant::now()) {
            ctx.request_repaint_after(wait.max(Duration::from_millis(1)));
        }

        // 3. UI 绘制
        egui::SidePanel::left("controls").min_width(250.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("Voltage Reader");
            ui.label(egui::RichText::new(&self.instrument).small());
            ui.separator();

            ui.label("Output File Name");
            ui.add_enabled(
                !self.inputs_locked,
                egui::TextEdit::singleline(&mut self.output_text),
            );

            ui.add_space(8.0);
            ui.add_enabled_ui(!self.inputs_locked, |ui| {
                egui::ComboBox::from_label("Readout interval")
                    .selected_text(self.interval.label())
                    .show_ui(ui, |ui| {
                        for interval in PollInterval::ALL {
                            ui.selectable_value(&mut self.interval, interval, interval.label());
                        }
                    });
            });

            ui.add_space(12.0);
            ui.horizontal(|ui| {
                let (text, fill) = if self.daq.is_running() {
                    ("STOP", Color32::from_rgb(150, 40, 40))
                } else {
                    ("START", Color32::from_rgb(40, 120, 40))
                };
                let toggle = egui::Button::new(egui::RichText::new(text).size(16.0).color(Color32::WHITE))
                    .fill(fill)
                    .min_size(egui::vec2(90.0, 40.0));
                if ui.add(toggle).clicked() {
                    self.toggle();
                }
                if ui
                    .add(egui::Button::new("Quit").min_size(egui::vec2(70.0, 40.0)))
                    .clicked()
                {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.add_space(8.0);
            let readings = self.daq.readings();
            ui.label(format!(
                "{:?}: {}/{} points in view",
                self.daq.state(),
                readings.len(),
                readings.capacity()
            ));
            if let Some(last) = readings.latest() {
                ui.monospace(format!("Last: {:.6} V @ {:.3} s", last.value, last.elapsed));
            }
            if let Some(session) = self.daq.session() {
                ui.label(format!(
                    "{} readings every {}",
                    session.ticks(),
                    session.interval()
                ));
            }
            if ui
                .add_enabled(!self.daq.readings().is_empty(), egui::Button::new("Save plot"))
                .clicked()
            {
                self.save_plot();
            }

            ui.add_space(10.0);
            ui.separator();
            egui::ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
                for m in &self.log_messages {
                    ui.monospace(m);
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(&self.status);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let points = self.daq.readings().to_points();
            Plot::new("voltage_plot")
                .x_axis_label("Time (s)")
                .y_axis_label("DCV")
                .auto_bounds_x()
                .auto_bounds_y()
                .show(ui, |plot_ui| {
                    if !points.is_empty() {
                        let color = Color32::from_rgb(40, 90, 220);
                        plot_ui.line(Line::new(PlotPoints::new(points.clone())).color(color));
                        plot_ui.points(Points::new(PlotPoints::new(points)).radius(3.0).color(color));
                    }
                });
        });
    }
}

impl Drop for VoltageReaderApp {
    fn drop(&mut self) {
        self.daq.shutdown();
    }
}
