//! Demo: a spinning, lit, checkerboard-textured cube rendered on the CPU and
//! presented through macroquad.
//!
//! Keys: W wireframe, P points, F fill, L lighting, C back-face culling.
//! Settings are read from `pipeline.ron` when present.

use std::path::Path;
use std::rc::Rc;

use bonnie_pipeline::rasterizer::{self as rast, mesh, BresenhamBackend, Device, Light, Material};
use bonnie_pipeline::{init_logging, load_config, ConfigError, LoggingConfig, PipelineConfig, RenderError};
use log::{error, info, warn};
use macroquad::prelude::*;

const CONFIG_PATH: &str = "pipeline.ron";

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Bonnie Pipeline v{}", env!("CARGO_PKG_VERSION")),
        window_width: 960,
        window_height: 720,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

/// Settings from `pipeline.ron`, or defaults when the file is absent
fn read_config() -> Result<PipelineConfig, ConfigError> {
    if !Path::new(CONFIG_PATH).exists() {
        return Ok(PipelineConfig::default());
    }
    load_config(CONFIG_PATH)
}

/// Scene state that lives in the parameter block
fn setup_scene(device: &mut Device, cfg: &PipelineConfig) -> Result<(), RenderError> {
    let params = device.params_mut();
    let aspect = cfg.width as f32 / cfg.height.max(1) as f32;
    params.set_projection(rast::Mat4::perspective_lh(1.0, aspect, 0.1, 100.0));
    params.set_view(rast::Mat4::look_at_lh(
        rast::Vec3::new(0.0, 2.0, -5.0),
        rast::Vec3::ZERO,
        rast::Vec3::UP,
    ));

    let checker = rast::Texture::checkerboard(
        64,
        64,
        8,
        rast::Color::new(0.9, 0.85, 0.7),
        rast::Color::new(0.35, 0.2, 0.45),
    );
    params.set_texture(0, Some(Rc::new(checker)))?;

    let mut key = Light::point(rast::Vec3::new(3.0, 4.0, -4.0), rast::Color::new(1.0, 0.95, 0.85));
    key.ambient = rast::Color::new(0.15, 0.15, 0.2);
    key.specular = rast::Color::WHITE;
    key.attenuation = rast::Attenuation { constant: 1.0, linear: 0.02, quadratic: 0.0 };
    params.set_light(0, Some(key))?;

    let fill = Light::directional(rast::Vec3::new(-1.0, 0.5, -0.5), rast::Color::new(0.3, 0.35, 0.5));
    params.set_light(1, Some(fill))?;
    Ok(())
}

fn cube_material(lighting: bool) -> Material {
    Material {
        ambient: rast::Color::WHITE,
        diffuse: rast::Color::WHITE,
        specular: rast::Color::new(0.5, 0.5, 0.5),
        shininess: 24.0,
        lighting,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    // Load errors are logged once the logger exists
    let (mut cfg, load_err) = match read_config() {
        Ok(cfg) => (cfg, None),
        Err(e) => (PipelineConfig::default(), Some(e)),
    };
    init_logging(LoggingConfig { env_filter: cfg.log_filter.clone(), ..Default::default() });
    if let Some(e) = load_err {
        warn!("failed to load {}: {}, using defaults", CONFIG_PATH, e);
    }

    if cfg.pixel_format != rast::PixelFormat::Rgba8 {
        warn!("presentation needs Rgba8, ignoring {:?}", cfg.pixel_format);
        cfg.pixel_format = rast::PixelFormat::Rgba8;
    }

    let mut device: Device = Device::new();
    device.bind_render_target(cfg.framebuffer());
    cfg.apply(&mut device);
    device.set_backend(Some(Box::new(BresenhamBackend::default())));

    let meshes = mesh::cube().and_then(|cube| {
        let backdrop = mesh::triangle(
            [
                rast::Vec3::new(-6.0, -2.0, 6.0),
                rast::Vec3::new(0.0, 5.0, 6.0),
                rast::Vec3::new(6.0, -2.0, 6.0),
            ],
            rast::Color::new(0.2, 0.3, 0.25),
        )?;
        setup_scene(&mut device, &cfg)?;
        Ok((cube, backdrop))
    });
    let ((cube_vb, cube_ib), (back_vb, back_ib)) = match meshes {
        Ok(m) => m,
        Err(e) => {
            error!("scene setup failed: {}", e);
            return;
        }
    };
    info!("rendering {}x{} {:?}", cfg.width, cfg.height, cfg.polygon_mode);

    let mut lighting = true;
    let mut angle = 0.0f32;

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }
        if is_key_pressed(KeyCode::W) {
            device.set_polygon_mode(rast::PolygonMode::Wireframe);
        }
        if is_key_pressed(KeyCode::P) {
            device.set_polygon_mode(rast::PolygonMode::Point);
        }
        if is_key_pressed(KeyCode::F) {
            device.set_polygon_mode(rast::PolygonMode::Fill);
        }
        if is_key_pressed(KeyCode::L) {
            lighting = !lighting;
        }
        if is_key_pressed(KeyCode::C) {
            let cull = device.cull_backfaces();
            device.set_cull_backfaces(!cull);
        }

        angle += get_frame_time();

        let frame = (|| -> Result<rast::DrawStats, RenderError> {
            device.clear(Some(cfg.clear_color), true)?;

            let params = device.params_mut();
            params.set_world(rast::Mat4::IDENTITY);
            params.set_material(Material::flat(rast::Color::WHITE));
            device.draw_indexed(&back_vb, &back_ib)?;

            let params = device.params_mut();
            params.set_world(rast::Mat4::rotation_y(angle) * rast::Mat4::rotation_x(angle * 0.6));
            params.set_material(cube_material(lighting));
            device.draw_indexed(&cube_vb, &cube_ib)
        })();

        let stats = match frame {
            Ok(stats) => stats,
            Err(e) => {
                error!("frame aborted: {}", e);
                rast::DrawStats::default()
            }
        };

        clear_background(BLACK);
        if let Some(fb) = device.render_target() {
            let texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
            texture.set_filter(FilterMode::Nearest);

            // Fit the window, keeping the aspect ratio
            let scale = (screen_width() / fb.width as f32).min(screen_height() / fb.height as f32);
            let (w, h) = (fb.width as f32 * scale, fb.height as f32 * scale);
            draw_texture_ex(
                &texture,
                (screen_width() - w) / 2.0,
                (screen_height() - h) / 2.0,
                WHITE,
                DrawTextureParams {
                    dest_size: Some(macroquad::math::Vec2::new(w, h)),
                    ..Default::default()
                },
            );
        }

        draw_text(
            &format!(
                "{:?}  lighting {}  cull {}  |  {} tris, {} culled, {} px",
                device.polygon_mode(),
                if lighting { "on" } else { "off" },
                if device.cull_backfaces() { "on" } else { "off" },
                stats.triangles,
                stats.culled(),
                stats.written
            ),
            10.0,
            20.0,
            18.0,
            WHITE,
        );

        next_frame().await
    }
}
