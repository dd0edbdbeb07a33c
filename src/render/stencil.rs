// 図面の中間表現。レイアウト計算の出力であり、SVGシリアライザと
// エクスポートの再テーマ処理の両方がこのツリーを走査する。
// 毎フレーム再計算され、保持されるのは直近のFrameだけ。

/// 全テキスト共通のフォントスタック
pub const FONT_STACK: &str = "Inter, system-ui, -apple-system, BlinkMacSystemFont, \"Segoe UI\", Roboto, Oxygen, Ubuntu, Cantarell, \"Fira Sans\", \"Droid Sans\", \"Helvetica Neue\", Arial, sans-serif";

/// テキストの役割。エクスポート時の再テーマがこれを見て
/// サイズ・太さ・色を引き直す(内容文字列への正規表現判定はしない)。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    LaneHeader,
    StepLabel,
    StepNote,
    VariantTag,
}

/// 接続線の draw-in アニメーション状態。
/// offset == 0 が「完全に描画済み」の最終状態。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashState {
    pub array: f32,
    pub offset: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stencil {
    /// レーンの背景バンド
    Rect {
        position: [f32; 2],
        width: f32,
        height: f32,
        radius: f32,
        fill: String,
        opacity: f32,
    },
    /// ステップラベルのパネル(枠線つき角丸矩形)
    Panel {
        position: [f32; 2],
        width: f32,
        height: f32,
        radius: f32,
        fill: String,
        stroke: String,
        stroke_width: f32,
        opacity: f32,
    },
    /// メッセージ矢印の本体。dash はアニメーション表現、
    /// transition_ms があるとライブ表示でだけ遷移スタイルが付く。
    Line {
        from: [f32; 2],
        to: [f32; 2],
        stroke: String,
        stroke_width: f32,
        dash: Option<DashState>,
        transition_ms: Option<u32>,
    },
    /// レーンの縦ガイドライン(4 4 の破線で全高に渡る)
    Guideline {
        from: [f32; 2],
        to: [f32; 2],
        stroke: String,
    },
    /// 行き先を向く三角矢じり。dir は +1(右向き) / -1(左向き)。
    ArrowHead {
        tip: [f32; 2],
        dir: f32,
        stroke: String,
    },
    Text {
        content: String,
        position: [f32; 2],
        size: f32,
        weight: u16,
        fill: String,
        letter_spacing: f32,
        role: TextRole,
    },
    /// 1ステップ分のまとまり。opacity がステップ可視性を持つ。
    Group {
        children: Vec<Stencil>,
        opacity: f32,
        fade_ms: Option<u32>,
    },
}

/// レンダリング済みの図面1枚
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: f32,
    pub height: f32,
    pub stencils: Vec<Stencil>,
}
