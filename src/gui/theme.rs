//! テーマ設定 - 落ち着いた紺系のダークテーマ

use egui::{Color32, CornerRadius, Stroke, Style, Visuals};

/// カラーパレット
pub struct Colors;

impl Colors {
    pub const BG_DARK: Color32 = Color32::from_rgb(14, 18, 28);
    pub const BG_CARD: Color32 = Color32::from_rgb(24, 31, 48);
    pub const BG_HOVER: Color32 = Color32::from_rgb(33, 44, 70);
    pub const ACCENT: Color32 = Color32::from_rgb(96, 165, 250);
    pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(236, 240, 248);
    pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(148, 163, 190);
    pub const SUCCESS: Color32 = Color32::from_rgb(74, 222, 128);
    pub const WARNING: Color32 = Color32::from_rgb(251, 191, 36);
    pub const ERROR: Color32 = Color32::from_rgb(248, 113, 113);
    pub const BORDER: Color32 = Color32::from_rgb(51, 65, 100);

    /// 処理結果のアイコンと色
    pub fn status(success: bool) -> (&'static str, Color32) {
        if success {
            ("✓", Self::SUCCESS)
        } else {
            ("✗", Self::ERROR)
        }
    }
}

/// ダークテーマのスタイルを作成
pub fn dark_theme() -> Style {
    let mut visuals = Visuals::dark();

    visuals.panel_fill = Colors::BG_DARK;
    visuals.window_fill = Colors::BG_CARD;
    visuals.window_stroke = Stroke::new(1.0, Colors::BORDER);
    visuals.extreme_bg_color = Colors::BG_DARK;
    visuals.faint_bg_color = Colors::BG_CARD;

    let radius = CornerRadius::same(6);
    let widgets = &mut visuals.widgets;
    for (state, fill, text) in [
        (&mut widgets.noninteractive, Colors::BG_CARD, Colors::TEXT_SECONDARY),
        (&mut widgets.inactive, Colors::BG_HOVER, Colors::TEXT_PRIMARY),
        (&mut widgets.hovered, Colors::BORDER, Colors::TEXT_PRIMARY),
        (&mut widgets.active, Colors::ACCENT, Colors::BG_DARK),
    ] {
        state.bg_fill = fill;
        state.weak_bg_fill = fill;
        state.fg_stroke = Stroke::new(1.0, text);
        state.corner_radius = radius;
    }

    visuals.selection.bg_fill = Colors::ACCENT.gamma_multiply(0.4);
    visuals.selection.stroke = Stroke::new(1.0, Colors::ACCENT);

    Style {
        visuals,
        ..Style::default()
    }
}
