// Frame を自己完結した SVG 文書へ直列化するバックエンド。
// 外部スタイルシートや class 参照は一切出力せず、全属性をインライン化する。

use crate::render::stencil::{Frame, Stencil};
use std::fmt::Write;

/// XML属性・テキスト用のエスケープ
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn serialize(frame: &Frame) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = frame.width,
        h = frame.height
    );
    for stencil in &frame.stencils {
        write_stencil(&mut out, stencil);
    }
    out.push_str("</svg>");
    out
}

fn write_stencil(out: &mut String, stencil: &Stencil) {
    match stencil {
        Stencil::Rect {
            position,
            width,
            height,
            radius,
            fill,
            opacity,
        } => {
            let _ = write!(
                out,
                "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{}\" fill=\"{}\" opacity=\"{}\"/>",
                position[0], position[1], width, height, radius, fill, opacity
            );
        }
        Stencil::Panel {
            position,
            width,
            height,
            radius,
            fill,
            stroke,
            stroke_width,
            opacity,
        } => {
            let _ = write!(
                out,
                "<rect x=\"{}\" y=\"{}\" rx=\"{r}\" ry=\"{r}\" width=\"{}\" height=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\" opacity=\"{}\"/>",
                position[0],
                position[1],
                width,
                height,
                fill,
                stroke,
                stroke_width,
                opacity,
                r = radius
            );
        }
        Stencil::Line {
            from,
            to,
            stroke,
            stroke_width,
            dash,
            transition_ms,
        } => {
            let _ = write!(
                out,
                "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"{}\"",
                from[0], from[1], to[0], to[1], stroke, stroke_width
            );
            if let Some(d) = dash {
                let _ = write!(
                    out,
                    " stroke-dasharray=\"{a} {a}\" stroke-dashoffset=\"{}\"",
                    d.offset,
                    a = d.array
                );
            }
            if let Some(ms) = transition_ms {
                let _ = write!(
                    out,
                    " style=\"transition: stroke-dashoffset {ms}ms ease\""
                );
            }
            out.push_str("/>");
        }
        Stencil::Guideline { from, to, stroke } => {
            let _ = write!(
                out,
                "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-dasharray=\"4 4\" stroke-width=\"1\"/>",
                from[0], from[1], to[0], to[1], stroke
            );
        }
        Stencil::ArrowHead { tip, dir, stroke } => {
            let back = tip[0] - super::layout::ARROW_SIZE * dir;
            let _ = write!(
                out,
                "<path d=\"M {} {} L {} {} L {} {}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>",
                back,
                tip[1] - 4.0,
                tip[0],
                tip[1],
                back,
                tip[1] + 4.0,
                stroke
            );
        }
        Stencil::Text {
            content,
            position,
            size,
            weight,
            fill,
            letter_spacing,
            ..
        } => {
            let _ = write!(
                out,
                "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"{}\" letter-spacing=\"{}px\" fill=\"{}\">{}</text>",
                position[0],
                position[1],
                escape(super::stencil::FONT_STACK),
                size,
                weight,
                letter_spacing,
                fill,
                escape(content)
            );
        }
        Stencil::Group {
            children,
            opacity,
            fade_ms,
        } => {
            let _ = write!(out, "<g opacity=\"{}\"", opacity);
            if let Some(ms) = fade_ms {
                let _ = write!(out, " style=\"transition: opacity {ms}ms ease\"");
            }
            out.push('>');
            for child in children {
                write_stencil(out, child);
            }
            out.push_str("</g>");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::stencil::TextRole;

    #[test]
    fn test_serialize_is_self_contained() {
        let frame = Frame {
            width: 100.0,
            height: 50.0,
            stencils: vec![Stencil::Text {
                content: "Quotes & pricing".to_string(),
                position: [10.0, 20.0],
                size: 12.0,
                weight: 500,
                fill: "#0f172a".to_string(),
                letter_spacing: 0.2,
                role: TextRole::StepLabel,
            }],
        };
        let svg = serialize(&frame);
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(svg.contains("viewBox=\"0 0 100 50\""));
        // テキスト内容と属性はエスケープ・インライン化される
        assert!(svg.contains("Quotes &amp; pricing"));
        assert!(svg.contains("font-family="));
        assert!(!svg.contains("class="));
        assert!(!svg.contains("href"));
    }

    #[test]
    fn test_dash_and_transition_serialization() {
        let line = Stencil::Line {
            from: [0.0, 0.0],
            to: [100.0, 0.0],
            stroke: "#6366f1".to_string(),
            stroke_width: 2.0,
            dash: Some(crate::render::stencil::DashState {
                array: 84.0,
                offset: 84.0,
            }),
            transition_ms: Some(700),
        };
        let frame = Frame {
            width: 100.0,
            height: 10.0,
            stencils: vec![line],
        };
        let svg = serialize(&frame);
        assert!(svg.contains("stroke-dasharray=\"84 84\""));
        assert!(svg.contains("stroke-dashoffset=\"84\""));
        assert!(svg.contains("transition: stroke-dashoffset 700ms ease"));
    }
}
