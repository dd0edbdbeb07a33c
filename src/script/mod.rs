// ========================================
// Script Generator Module
// ========================================
//
// シナリオモードからステップ台本(Script)を生成する純粋関数群。
// 同じモードからは常に同一の台本が返る(順序安定・副作用なし)。
// ステップは生成後に変更されない。

/// シーケンス図に並ぶ固定レーン(参加者)。台本生成後は不変。
pub const LANES: [&str; 4] = ["User", "Agent", "Merchant Agent", "Network"];

/// アクセントなしステップの接続線の色
pub const DEFAULT_STEP_COLOR: &str = "#6366f1";

/// モード固有ステップ(variant_only)の枠線・注記の色
pub const VARIANT_ACCENT: &str = "#d97706";

/// シナリオモード。どちらの台本を生成するかを決める閉じた列挙。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioMode {
    HumanPresent,
    Delegated,
}

impl ScenarioMode {
    /// エクスポートファイル名などに使う短い識別子
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioMode::HumanPresent => "human",
            ScenarioMode::Delegated => "delegated",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScenarioMode::HumanPresent => "Human-present",
            ScenarioMode::Delegated => "Delegated",
        }
    }
}

/// クレデンシャル種別ごとの色分けカテゴリ(閉集合)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accent {
    Intent,
    Cart,
    Payment,
}

impl Accent {
    pub fn color(&self) -> &'static str {
        match self {
            Accent::Intent => "#2563eb",
            Accent::Cart => "#16a34a",
            Accent::Payment => "#dc2626",
        }
    }
}

/// 台本中の1ステップ(レーン間の有向メッセージ)。
/// variant_only はラベル文字列からの推測ではなく生成時に明示的に立てる。
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub id: u32,
    pub label: String,
    pub from: usize,
    pub to: usize,
    pub note: Option<String>,
    pub accent: Option<Accent>,
    pub variant_only: bool,
}

impl Step {
    fn variant(mut self) -> Self {
        self.variant_only = true;
        self
    }
}

fn step(id: u32, label: &str, from: usize, to: usize, note: &str, accent: Option<Accent>) -> Step {
    Step {
        id,
        label: label.to_string(),
        from,
        to,
        note: Some(note.to_string()),
        accent,
        variant_only: false,
    }
}

/// モードに対応する台本を生成する。純粋・決定的で、両モードとも
/// 同数(11)のステップを返すため UI 側で「Step i / len」を並べて比較できる。
pub fn build_script(mode: ScenarioMode) -> Vec<Step> {
    use Accent::*;
    match mode {
        ScenarioMode::HumanPresent => vec![
            step(1, "Express need", 0, 1, "User describes purchase goal", None),
            step(2, "Sign Intent VC", 0, 1, "Delegation constraints", Some(Intent)),
            step(3, "Intent VC →", 1, 2, "Agent presents scoped mandate", Some(Intent)),
            step(4, "Negotiation / Offers", 2, 1, "Merchant quotes & pricing", None),
            step(5, "Approve cart?", 0, 1, "Human review or policy", None),
            step(6, "Build Cart VC", 1, 2, "Immutable line items", Some(Cart)),
            step(7, "Cart VC →", 1, 2, "Hash links Intent", Some(Cart)),
            step(8, "Create Payment VC", 1, 3, "Presence + metadata", Some(Payment)),
            step(9, "Payment VC →", 1, 3, "Submission to rails", Some(Payment)),
            step(10, "Result / Status ←", 3, 1, "Clearing response", None),
            step(11, "Result ←", 1, 0, "User confirmation", None),
        ],
        ScenarioMode::Delegated => vec![
            step(1, "Express need", 0, 1, "User goal", None),
            step(2, "Sign Intent VC", 0, 1, "Richer constraints", Some(Intent)),
            step(3, "Intent VC →", 1, 2, "Scope & bounds", Some(Intent)),
            step(4, "Negotiation / Offers", 2, 1, "Autonomous explore", None),
            // 自己ループ: Agent が自分の制約監視を回す。Delegated モードにしか無い
            step(5, "Monitor constraints", 1, 1, "Triggers watch", Some(Cart)).variant(),
            step(6, "Build Cart VC", 1, 2, "Auto snapshot", Some(Cart)),
            step(7, "Cart VC →", 1, 2, "Hash links Intent", Some(Cart)),
            step(8, "Create Payment VC", 1, 3, "Presence: NOT_PRESENT", Some(Payment)),
            step(9, "Payment VC →", 1, 3, "Submission", Some(Payment)),
            step(10, "Result / Status ←", 3, 1, "Network response", None),
            step(11, "Result ←", 1, 0, "Async notify", None),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_is_deterministic() {
        for mode in [ScenarioMode::HumanPresent, ScenarioMode::Delegated] {
            let a = build_script(mode);
            let b = build_script(mode);
            assert!(!a.is_empty());
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_modes_have_equal_cardinality() {
        let human = build_script(ScenarioMode::HumanPresent);
        let delegated = build_script(ScenarioMode::Delegated);
        assert_eq!(human.len(), delegated.len());
        assert_eq!(human.len(), 11);
    }

    #[test]
    fn test_modes_differ_materially() {
        let human = build_script(ScenarioMode::HumanPresent);
        let delegated = build_script(ScenarioMode::Delegated);
        // 少なくとも1つの対応ステップで内容が異なること
        assert!(
            human
                .iter()
                .zip(delegated.iter())
                .any(|(h, d)| h.label != d.label || h.note != d.note)
        );
    }

    #[test]
    fn test_variant_flag_is_explicit() {
        let human = build_script(ScenarioMode::HumanPresent);
        assert!(human.iter().all(|s| !s.variant_only));

        let delegated = build_script(ScenarioMode::Delegated);
        let variants: Vec<&Step> = delegated.iter().filter(|s| s.variant_only).collect();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].label, "Monitor constraints");
        // 自己ループも許される
        assert_eq!(variants[0].from, variants[0].to);
    }

    #[test]
    fn test_ids_are_sequential_and_lanes_in_range() {
        for mode in [ScenarioMode::HumanPresent, ScenarioMode::Delegated] {
            for (i, s) in build_script(mode).iter().enumerate() {
                assert_eq!(s.id as usize, i + 1);
                assert!(s.from < LANES.len());
                assert!(s.to < LANES.len());
            }
        }
    }
}
