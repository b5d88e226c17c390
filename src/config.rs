use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// A4 portrait in points.
pub const A4_WIDTH: f32 = 595.28;
pub const A4_HEIGHT: f32 = 841.89;

/// Geometry and type sizes used by the flow engine.
#[derive(Clone, Debug, PartialEq)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,

    pub body_size: f32,
    pub body_leading: f32,
    pub paragraph_gap: f32,
    pub heading_size: f32,
    pub heading_advance: f32,
    pub subheading_size: f32,
    pub subheading_advance: f32,
    /// Sub-headings break to a new page when less room than this remains.
    pub subheading_min_room: f32,

    pub table_font_size: f32,
    pub caption_size: f32,
    pub caption_leading: f32,
    pub figure_max_height: f32,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            width: A4_WIDTH,
            height: A4_HEIGHT,
            margin_left: 50.0,
            margin_right: 50.0,
            margin_top: 70.0,
            margin_bottom: 60.0,

            body_size: 11.0,
            body_leading: 14.0,
            paragraph_gap: 6.0,
            heading_size: 16.0,
            heading_advance: 24.0,
            subheading_size: 13.0,
            subheading_advance: 18.0,
            subheading_min_room: 30.0,

            table_font_size: 9.0,
            caption_size: 10.0,
            caption_leading: 12.0,
            figure_max_height: 260.0,
        }
    }
}

impl PageSetup {
    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Lowest y (top-down) a line may start at before a page break.
    pub fn bottom_limit(&self) -> f32 {
        self.height - self.margin_bottom
    }
}

/// Runtime settings for the web binary, read from the environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let bind_addr = env::var("REPORT_BIND_ADDR")
            .ok()
            .and_then(|v| match v.parse() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    log::warn!("ignoring unparseable REPORT_BIND_ADDR `{}`", v);
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));

        let data_dir = env::var_os("REPORT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("database"));
        let static_dir = env::var_os("REPORT_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("static"));

        log::debug!("server config: bind={}", bind_addr);

        Self {
            bind_addr,
            data_dir,
            static_dir,
        }
    }

    pub fn drafts_dir(&self) -> PathBuf {
        self.data_dir.join("drafts")
    }

    pub fn submissions_dir(&self) -> PathBuf {
        self.data_dir.join("submissions")
    }
}
