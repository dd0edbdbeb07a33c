// ========================================
// Export Subsystem
// ========================================
//
// レンダリング済みFrameを複製し、ライブテーマとは独立した
// エクスポート用パレットに引き直してから、ベクタ(SVG)と
// ビットマップ(PNG, 2x supersampling)として届ける。
// 失敗はログに残して no-op に落とす(ホストを巻き込まない)。

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::render::stencil::{Frame, Stencil, TextRole};
use crate::script::ScenarioMode;

/// エクスポートファイル名の接頭辞: <prefix>-<mode>-<theme>.<ext>
pub const ARTIFACT_PREFIX: &str = "ap2-sequence";

/// ラスタ化時の固定スーパーサンプリング倍率
pub const RASTER_SCALE: f32 = 2.0;

/// 操作者がエクスポート時に明示的に選ぶテーマ。
/// ライブ表示のEnvSignalsとは一致しなくてよい。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTheme {
    Light,
    Dark,
}

impl ExportTheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportTheme::Light => "light",
            ExportTheme::Dark => "dark",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            ExportTheme::Light => Palette {
                bg: "#ffffff",
                primary: "#0f172a",
                secondary: "#475569",
                panel: "#ffffff",
            },
            ExportTheme::Dark => Palette {
                bg: "#0b1220",
                primary: "#f1f5f9",
                secondary: "#94a3b8",
                panel: "#1e293b",
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg: &'static str,
    pub primary: &'static str,
    pub secondary: &'static str,
    pub panel: &'static str,
}

pub fn filename(prefix: &str, mode: ScenarioMode, theme: ExportTheme, ext: &str) -> String {
    format!("{}-{}-{}.{}", prefix, mode.as_str(), theme.as_str(), ext)
}

/// Frameを複製してエクスポートパレットに引き直す。
/// 遷移スタイルと破線は取り除かれ、全ステンシルが最終状態に固定される。
pub fn retheme(frame: &Frame, theme: ExportTheme) -> Frame {
    let pal = theme.palette();
    let mut stencils = Vec::with_capacity(frame.stencils.len() + 1);

    // キャンバス全面の不透明背景を先頭に敷く
    stencils.push(Stencil::Rect {
        position: [0.0, 0.0],
        width: frame.width,
        height: frame.height,
        radius: 0.0,
        fill: pal.bg.to_string(),
        opacity: 1.0,
    });
    for s in &frame.stencils {
        stencils.push(retheme_stencil(s, &pal));
    }

    Frame {
        width: frame.width,
        height: frame.height,
        stencils,
    }
}

fn retheme_stencil(stencil: &Stencil, pal: &Palette) -> Stencil {
    match stencil {
        Stencil::Group {
            children, opacity, ..
        } => Stencil::Group {
            children: children.iter().map(|c| retheme_stencil(c, pal)).collect(),
            opacity: *opacity,
            fade_ms: None,
        },
        Stencil::Line {
            from,
            to,
            stroke,
            stroke_width,
            ..
        } => Stencil::Line {
            from: *from,
            to: *to,
            stroke: stroke.clone(),
            stroke_width: *stroke_width,
            dash: None,
            transition_ms: None,
        },
        Stencil::Panel {
            position,
            width,
            height,
            radius,
            stroke,
            stroke_width,
            ..
        } => Stencil::Panel {
            position: *position,
            width: *width,
            height: *height,
            radius: *radius,
            fill: pal.panel.to_string(),
            stroke: stroke.clone(),
            stroke_width: *stroke_width,
            opacity: 1.0,
        },
        Stencil::Text {
            content,
            position,
            fill,
            role,
            ..
        } => {
            // 役割ごとにエクスポート用のタイポグラフィへ引き直す
            let (size, weight, letter_spacing, fill) = match role {
                TextRole::LaneHeader => (18.0, 700, 0.6, pal.primary.to_string()),
                TextRole::StepLabel => (12.0, 500, 0.2, pal.primary.to_string()),
                TextRole::StepNote => (10.0, 400, 0.0, pal.secondary.to_string()),
                // アクセント色は保持する
                TextRole::VariantTag => (9.0, 500, 0.0, fill.clone()),
            };
            Stencil::Text {
                content: content.clone(),
                position: *position,
                size,
                weight,
                fill,
                letter_spacing,
                role: *role,
            }
        }
        other => other.clone(),
    }
}

/// 直列化済みSVGを2xでラスタ化してPNGバイト列にする
pub fn rasterize(svg: &str, width: f32, height: f32) -> Result<Vec<u8>, String> {
    let rtree = resvg::usvg::Tree::from_data(svg.as_bytes(), &resvg::usvg::Options::default())
        .map_err(|e| format!("SVG parse failed: {e}"))?;

    let w = (width * RASTER_SCALE) as u32;
    let h = (height * RASTER_SCALE) as u32;
    let mut pixmap =
        tiny_skia::Pixmap::new(w, h).ok_or_else(|| "Failed to create pixmap".to_string())?;

    resvg::render(
        &rtree,
        tiny_skia::Transform::from_scale(RASTER_SCALE, RASTER_SCALE),
        &mut pixmap.as_mut(),
    );

    let pixels = pixmap.take();
    let img = image::RgbaImage::from_raw(w, h, pixels)
        .ok_or_else(|| "pixmap size mismatch".to_string())?;

    let mut out = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| format!("PNG encode failed: {e}"))?;
    Ok(out)
}

/// ダウンロード先の注入口。ブラウザのアンカークリックの代わりに
/// バイト列・ファイル名・MIMEを受け取る。
pub trait FileDownloadSink {
    fn deliver(&mut self, bytes: &[u8], filename: &str, mime: &str) -> Result<(), String>;
}

/// ディレクトリ配下にファイルとして書き出すシンク(CLIが使う)
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FileDownloadSink for DirectorySink {
    fn deliver(&mut self, bytes: &[u8], filename: &str, mime: &str) -> Result<(), String> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| format!("failed to create {}: {e}", self.dir.display()))?;
        let path = self.dir.join(filename);
        std::fs::write(&path, bytes)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        log::info!("wrote {} ({} bytes, {})", path.display(), bytes.len(), mime);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Delivery {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: String,
}

/// 出力をメモリに蓄えるシンク。テストと組み込みホスト用。
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Rc<RefCell<Vec<Delivery>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.inner.borrow().clone()
    }
}

impl FileDownloadSink for MemorySink {
    fn deliver(&mut self, bytes: &[u8], filename: &str, mime: &str) -> Result<(), String> {
        self.inner.borrow_mut().push(Delivery {
            bytes: bytes.to_vec(),
            filename: filename.to_string(),
            mime: mime.to_string(),
        });
        Ok(())
    }
}
