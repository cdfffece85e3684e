// main.rs - city map viewer: window, event loop, menus and status bar

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod camera;
mod config;
mod gesture;
mod i18n;
mod input;
mod labels;
mod map;
mod matrix;
mod mesh;
mod overlay;
mod projector;
mod renderer;
mod viewer;

use camera::OPENGL_TO_WGPU;
use config::ViewerConfig;
use map::CityMap;
use mesh::Vertex;
use overlay::LabelOverlay;
use renderer::Renderer;
use viewer::MapViewer;

use anyhow::Context;
use glam::{Mat4, Vec2};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

/// A parsed and tessellated map, ready to hand to the GPU.
struct LoadedMap {
    map: CityMap,
    vertices: Vec<Vertex>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = ViewerConfig::from_env();
    log::info!(
        "data directory {}, language {}",
        config.data_dir.display(),
        config.lang
    );
    i18n::init(&config.lang, &config.data_dir);
    let mut current_lang = i18n::current_lang();

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(i18n::tr("app.title"))
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .context("creating window")?,
    );

    let mut renderer = pollster::block_on(Renderer::new(window.clone()))?;
    let mut viewer = MapViewer::new(&config.settings);
    let mut overlay = LabelOverlay::default();
    let mut data_dir = config.data_dir.clone();

    let mut last_frame_time = Instant::now();
    let mut frame_count = 0;
    let mut fps = 0.0;
    let mut show_fps = false;

    let (tx, rx): (Sender<LoadedMap>, Receiver<LoadedMap>) = channel();
    let mut is_loading = true;
    start_load_map(data_dir.clone(), tx.clone());

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Ok(loaded) = rx.try_recv() {
            install_map(loaded, &mut renderer, &mut viewer, &mut overlay);
            is_loading = false;
        }

        match event {
            Event::WindowEvent { event, .. } => {
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    viewer.input.handle_consumed(&event, &mut viewer.gestures, &mut viewer.camera);
                    return;
                }

                let viewport = Vec2::new(renderer.size.width as f32, renderer.size.height as f32);
                if viewer.input.handle(&event, &mut viewer.gestures, &mut viewer.camera, viewport) {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                    }

                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        renderer.resize(*new_inner_size);
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            match input.virtual_keycode {
                                Some(VirtualKeyCode::O) => {
                                    if let Some(dir) = pick_map_folder(&data_dir) {
                                        data_dir = dir;
                                        is_loading = true;
                                        start_load_map(data_dir.clone(), tx.clone());
                                    }
                                }
                                Some(VirtualKeyCode::F11) => toggle_fullscreen(&mut viewer, &window),
                                Some(VirtualKeyCode::R) => viewer.reset_camera(),
                                _ => {}
                            }
                        }
                    }

                    WindowEvent::DroppedFile(path) => {
                        let dir = if path.is_dir() {
                            path
                        } else {
                            path.parent().map(Path::to_path_buf).unwrap_or(path)
                        };
                        data_dir = dir;
                        is_loading = true;
                        start_load_map(data_dir.clone(), tx.clone());
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                frame_count += 1;
                let now = Instant::now();
                if now.duration_since(last_frame_time).as_secs_f32() >= 1.0 {
                    fps = frame_count as f32 / now.duration_since(last_frame_time).as_secs_f32();
                    frame_count = 0;
                    last_frame_time = now;
                }

                let lens = viewer.lens(renderer.size.width, renderer.size.height);
                let frame = viewer.frame_view(&lens);
                let view_proj = Mat4::from_cols_array(&matrix::mult_mat4(&frame.projection, &frame.view));
                renderer.update_camera(OPENGL_TO_WGPU * view_proj);
                viewer.update_labels(&frame);

                let mut next_dir = None;
                let render_result = renderer.render_with_ui(&window, |ctx| {
                    if viewer.show_labels {
                        overlay.draw(ctx, &viewer.labels, &viewer.placements);
                    }
                    draw_ui(
                        ctx,
                        &mut viewer,
                        &data_dir,
                        &mut next_dir,
                        &mut show_fps,
                        fps,
                        is_loading,
                        &window,
                        &mut current_lang,
                    );
                });

                if let Some(dir) = next_dir {
                    data_dir = dir;
                    is_loading = true;
                    start_load_map(data_dir.clone(), tx.clone());
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("GPU out of memory");
                        *control_flow = ControlFlow::Exit;
                    }
                    Err(e) => log::warn!("render error: {:?}", e),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

fn start_load_map(dir: PathBuf, tx: Sender<LoadedMap>) {
    thread::spawn(move || {
        log::info!("loading map from {}", dir.display());
        let started = Instant::now();
        let map = map::load_city_map(&dir);
        let vertices = mesh::build_map_mesh(&map.features);
        log::info!(
            "map loaded in {:.2}s: {} features, {} labels",
            started.elapsed().as_secs_f32(),
            map.features.len(),
            map.labels.len()
        );
        if tx.send(LoadedMap { map, vertices }).is_err() {
            log::warn!("viewer closed before the map finished loading");
        }
    });
}

fn install_map(
    loaded: LoadedMap,
    renderer: &mut Renderer,
    viewer: &mut MapViewer,
    overlay: &mut LabelOverlay,
) {
    let LoadedMap { map, vertices } = loaded;
    renderer.upload_mesh(&vertices);
    if map.font.is_some() {
        renderer::install_fonts(&renderer.egui_ctx, map.font);
    }
    overlay.install_icons(&renderer.egui_ctx, map.icons);
    viewer.labels = map.labels;
    viewer.placements.clear();
}

fn pick_map_folder(current: &Path) -> Option<PathBuf> {
    rfd::FileDialog::new().set_directory(current).pick_folder()
}

fn toggle_fullscreen(viewer: &mut MapViewer, window: &Window) {
    viewer.is_fullscreen = !viewer.is_fullscreen;
    if viewer.is_fullscreen {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_ui(
    ctx: &egui::Context,
    viewer: &mut MapViewer,
    data_dir: &Path,
    next_dir: &mut Option<PathBuf>,
    show_fps: &mut bool,
    fps: f32,
    is_loading: bool,
    window: &Window,
    current_lang: &mut String,
) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button(i18n::tr("menu.file"), |ui| {
                if ui.button(i18n::tr("menu.open_folder")).clicked() {
                    ui.close_menu();
                    *next_dir = pick_map_folder(data_dir);
                }
                if ui.button(i18n::tr("menu.exit")).clicked() {
                    std::process::exit(0);
                }
            });

            ui.menu_button(i18n::tr("menu.view"), |ui| {
                if ui.button(i18n::tr("view.reset")).clicked() {
                    viewer.reset_camera();
                    ui.close_menu();
                }

                let fullscreen_label = if viewer.is_fullscreen {
                    i18n::tr("view.fullscreen.exit")
                } else {
                    i18n::tr("view.fullscreen.enter")
                };
                if ui.button(fullscreen_label).clicked() {
                    toggle_fullscreen(viewer, window);
                    ui.close_menu();
                }

                ui.separator();
                ui.checkbox(&mut viewer.show_labels, i18n::tr("view.show_labels"));
                ui.checkbox(show_fps, i18n::tr("view.show_fps"));
            });

            ui.menu_button(i18n::tr("menu.language"), |ui| {
                let langs: [(&str, &str); 2] = [("en", "English"), ("ru", "Русский")];
                for (code, name) in langs {
                    if ui.radio_value(current_lang, code.to_string(), name).clicked() {
                        i18n::init(current_lang, data_dir);
                        window.set_title(&i18n::tr("app.title"));
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if is_loading {
                ui.label(egui::RichText::new(i18n::tr("status.loading")).color(egui::Color32::YELLOW));
                ui.label("|");
            }

            let camera = &viewer.camera;
            ui.label(format!("{}: {:.2}×", i18n::tr("status.zoom"), camera.zoom()));
            ui.label("|");
            ui.label(format!("{}: {:.1}°", i18n::tr("status.yaw"), camera.yaw().to_degrees()));
            ui.label("|");
            ui.label(format!("{}: {:.1}°", i18n::tr("status.pitch"), camera.pitch().to_degrees()));
            ui.label("|");
            let pan = camera.pan();
            ui.label(format!("{}: {:.0}, {:.0}", i18n::tr("status.pan"), pan.x, pan.y));
            ui.label("|");
            ui.label(i18n::tr_with(
                "status.labels",
                &[
                    ("visible", viewer.visible_label_count().to_string()),
                    ("total", viewer.labels.len().to_string()),
                ],
            ));
            ui.label("|");
            let touch = if viewer.gestures.touch_active() {
                format!(" ({})", i18n::tr("status.touch"))
            } else {
                String::new()
            };
            ui.label(format!(
                "{}: {:?}{}",
                i18n::tr("status.gesture"),
                viewer.gestures.state().mode(),
                touch
            ));

            if *show_fps {
                ui.label("|");
                ui.label(egui::RichText::new(format!("FPS: {:.1}", fps)).color(egui::Color32::GREEN));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.weak(i18n::tr("status.hint"));
            });
        });
    });
}
