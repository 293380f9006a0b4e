pub mod bitmap_font;
pub mod cpu_overlay_renderer;
