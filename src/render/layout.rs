// ========================================
// Layout & Render Pipeline
// ========================================
//
// 台本 + 再生状態 + 環境シグナルから図面ジオメトリを計算し、
// ステンシルツリーに落とす。可視性のルール:
//   - i < current のステップは不透明度1(既に起きた)
//   - i == current - 1 かつ再生中のステップは draw-in アニメーション中
//   - それ以外は不透明度0のままレイアウト空間だけ占める

use crate::env::EnvSignals;
use crate::playback::Playback;
use crate::render::stencil::{DashState, Frame, Stencil, TextRole};
use crate::script::{DEFAULT_STEP_COLOR, LANES, ScenarioMode, Step, VARIANT_ACCENT};

pub const LANE_W: f32 = 180.0;
pub const LANE_GAP: f32 = 40.0;
pub const STEP_H: f32 = 54.0;
pub const PAD: f32 = 16.0;
/// 先頭ステップ行のY座標(レーン見出しの下)
pub const HEADER_OFFSET: f32 = 64.0;
/// 矢印両端をレーン中心線から引っ込める量
pub const ARROW_INSET: f32 = 8.0;
pub const ARROW_SIZE: f32 = 6.0;

const DRAW_IN_MS: u32 = 700;
const FADE_MS: u32 = 400;

/// レーンi列の水平中心
pub fn lane_center_x(index: usize) -> f32 {
    PAD + index as f32 * (LANE_W + LANE_GAP) + LANE_W / 2.0
}

/// キャンバス寸法 = レーン幅×L + 間隔×(L-1) + 余白、高さ = 行数×行高 + 上下マージン
pub fn canvas_size(lane_count: usize, step_count: usize) -> (f32, f32) {
    let w = lane_count as f32 * LANE_W + (lane_count - 1) as f32 * LANE_GAP + PAD * 2.0;
    let h = step_count as f32 * STEP_H + 80.0;
    (w, h)
}

pub fn step_row_y(index: usize) -> f32 {
    HEADER_OFFSET + index as f32 * STEP_H
}

fn band_style(dark: bool, index: usize) -> (&'static str, f32) {
    if dark {
        (if index % 2 == 1 { "#0f172a" } else { "#132035" }, 0.25)
    } else {
        (if index % 2 == 1 { "#f8fafc" } else { "#ffffff" }, 0.65)
    }
}

/// 台本全体を1枚のFrameにレイアウトする
pub fn build_frame(
    script: &[Step],
    mode: ScenarioMode,
    playback: Playback,
    signals: EnvSignals,
) -> Frame {
    let (total_w, total_h) = canvas_size(LANES.len(), script.len());
    let mut stencils = Vec::new();

    // 背景バンド(交互の濃淡で行の追いやすさを上げる)
    for i in 0..LANES.len() {
        let x0 = PAD + i as f32 * (LANE_W + LANE_GAP);
        let (fill, opacity) = band_style(signals.dark, i);
        stencils.push(Stencil::Rect {
            position: [x0 - 10.0, 28.0],
            width: LANE_W + 20.0,
            height: total_h - 56.0,
            radius: 8.0,
            fill: fill.to_string(),
            opacity,
        });
    }

    // レーン見出しとガイドライン
    for (i, lane) in LANES.iter().enumerate() {
        let x = lane_center_x(i);
        stencils.push(Stencil::Text {
            content: lane.to_uppercase(),
            position: [x, 20.0],
            size: 16.0,
            weight: 700,
            fill: if signals.dark { "#f8fafc" } else { "#0f172a" }.to_string(),
            letter_spacing: 0.55,
            role: TextRole::LaneHeader,
        });
        stencils.push(Stencil::Guideline {
            from: [x, 34.0],
            to: [x, total_h - 20.0],
            stroke: "#64748b".to_string(),
        });
    }

    for (i, step) in script.iter().enumerate() {
        match build_step(step, i, mode, playback, signals) {
            Some(group) => stencils.push(group),
            // レーン参照が範囲外のステップは描画されないだけで落ちない
            None => log::warn!(
                "step {} references lane out of range ({} -> {}), not rendered",
                step.id,
                step.from,
                step.to
            ),
        }
    }

    Frame {
        width: total_w,
        height: total_h,
        stencils,
    }
}

fn build_step(
    step: &Step,
    index: usize,
    mode: ScenarioMode,
    playback: Playback,
    signals: EnvSignals,
) -> Option<Stencil> {
    if step.from >= LANES.len() || step.to >= LANES.len() {
        return None;
    }

    let visible = index < playback.current;
    let animating = playback.playing && index + 1 == playback.current;
    let opacity = if visible || animating { 1.0 } else { 0.0 };

    let color = step
        .accent
        .map(|a| a.color())
        .unwrap_or(DEFAULT_STEP_COLOR)
        .to_string();

    let from_x = lane_center_x(step.from);
    let to_x = lane_center_x(step.to);
    let y = step_row_y(index);
    let dir = if to_x >= from_x { 1.0 } else { -1.0 };
    let start = from_x + ARROW_INSET * dir;
    let end = to_x - ARROW_INSET * dir;
    // 自己ループでは負になるので0で止める
    let dash_len = ((to_x - from_x).abs() - ARROW_INSET * 2.0).max(0.0);

    let dash = if signals.reduced_motion {
        None
    } else {
        Some(DashState {
            array: dash_len,
            offset: if animating { dash_len } else { 0.0 },
        })
    };

    let border = if step.variant_only { VARIANT_ACCENT } else { color.as_str() };
    let panel_x = start.min(end) + 2.0;
    let panel_w = 110.0_f32.max((end - start).abs() - 24.0);

    let mut children = vec![
        Stencil::Line {
            from: [start, y],
            to: [end, y],
            stroke: color.clone(),
            stroke_width: 2.0,
            dash,
            transition_ms: (!signals.reduced_motion).then_some(DRAW_IN_MS),
        },
        Stencil::ArrowHead {
            tip: [end, y],
            dir,
            stroke: color.clone(),
        },
        Stencil::Panel {
            position: [panel_x, y - 18.0],
            width: panel_w,
            height: 36.0,
            radius: 6.0,
            fill: if signals.dark { "#0f172a" } else { "#ffffff" }.to_string(),
            stroke: border.to_string(),
            stroke_width: if step.variant_only { 2.0 } else { 1.2 },
            opacity: 0.95,
        },
        Stencil::Text {
            content: step.label.clone(),
            position: [(start + end) / 2.0, y - 2.0],
            size: 12.0,
            weight: 500,
            fill: if signals.dark { "#ffffff" } else { "#0f172a" }.to_string(),
            letter_spacing: 0.2,
            role: TextRole::StepLabel,
        },
    ];

    if let Some(note) = &step.note {
        children.push(Stencil::Text {
            content: note.clone(),
            position: [(start + end) / 2.0, y + 11.0],
            size: 10.0,
            weight: 400,
            fill: if signals.dark { "#cbd5e1" } else { "#475569" }.to_string(),
            letter_spacing: 0.0,
            role: TextRole::StepNote,
        });
    }

    if step.variant_only {
        children.push(Stencil::Text {
            content: format!("{}-only", mode.label()),
            position: [(start + end) / 2.0, y - 24.0],
            size: 9.0,
            weight: 500,
            fill: VARIANT_ACCENT.to_string(),
            letter_spacing: 0.0,
            role: TextRole::VariantTag,
        });
    }

    Some(Stencil::Group {
        children,
        opacity,
        fade_ms: Some(FADE_MS),
    })
}
