use crate::msg::BusMessage;

/// Vertical offset between the selection rect and the bubble.
pub const BUBBLE_VERTICAL_GAP: f64 = 8.0;
/// Minimum distance kept between the bubble and the viewport edges.
pub const BUBBLE_HORIZONTAL_MARGIN: f64 = 8.0;

/// Trim a raw selection; whitespace-only selections produce nothing.
pub fn normalized_selection(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// The message a bubble click emits. No tab id is attached; the relay
/// resolves the tab from the sender.
pub fn prefill_message(raw: &str) -> Option<BusMessage> {
    normalized_selection(raw).map(|text| BusMessage::Prefill {
        text,
        tab_id: None,
        auto_send: Some(false),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Visible viewport, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset_left: f64,
    pub offset_top: f64,
    pub width: f64,
    pub height: f64,
}

/// Scale/translate a page applies to fixed-position coordinates, measured
/// by probing where a fixed node actually lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPositionTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl FixedPositionTransform {
    pub const IDENTITY: Self = Self {
        scale_x: 1.0,
        scale_y: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    /// Derive the transform from three probe measurements: where a fixed
    /// node at (0,0) lands, where it lands after moving 100px right, and
    /// after moving 100px down. Degenerate deltas fall back to scale 1.
    pub fn from_probes(origin: Point, x_probe: Point, y_probe: Point) -> Self {
        let delta_x = x_probe.x - origin.x;
        let delta_y = y_probe.y - origin.y;
        Self {
            scale_x: if delta_x.abs() < 1e-4 {
                1.0
            } else {
                delta_x / 100.0
            },
            scale_y: if delta_y.abs() < 1e-4 {
                1.0
            } else {
                delta_y / 100.0
            },
            translate_x: origin.x,
            translate_y: origin.y,
        }
    }

    fn safe_scale_x(&self) -> f64 {
        if self.scale_x.abs() < 1e-4 {
            1.0
        } else {
            self.scale_x
        }
    }

    fn safe_scale_y(&self) -> f64 {
        if self.scale_y.abs() < 1e-4 {
            1.0
        } else {
            self.scale_y
        }
    }
}

/// Convert screen coordinates into layout coordinates, cancelling out any
/// page zoom or transform.
pub fn convert_screen_to_layout(screen: Point, transform: &FixedPositionTransform) -> Point {
    Point {
        x: (screen.x - transform.translate_x) / transform.safe_scale_x(),
        y: (screen.y - transform.translate_y) / transform.safe_scale_y(),
    }
}

/// Where to place the bubble, in layout coordinates.
///
/// Forward selections anchor at the rect's right edge, backward ones at
/// the left; a degenerate rect falls back to the last pointer position.
/// The result is clamped so the bubble stays inside the viewport.
pub fn bubble_position(
    selection_rect: Rect,
    is_forward: bool,
    bubble_width: f64,
    bubble_height: f64,
    viewport: Viewport,
    last_pointer: Option<Point>,
    transform: &FixedPositionTransform,
) -> Point {
    let bubble_w = (bubble_width * transform.safe_scale_x()).abs();
    let bubble_h = (bubble_height * transform.safe_scale_y()).abs();

    let rect_is_tiny =
        selection_rect.width().abs() < 1.0 && selection_rect.height().abs() < 1.0;
    let anchor_left = if rect_is_tiny {
        last_pointer.map_or(selection_rect.right, |p| p.x)
    } else if is_forward {
        selection_rect.right
    } else {
        selection_rect.left
    };
    let anchor_top = if rect_is_tiny {
        last_pointer.map_or(selection_rect.bottom, |p| p.y)
    } else {
        selection_rect.bottom
    };

    let unclamped_left = anchor_left - bubble_w;
    let min_left = viewport.offset_left + BUBBLE_HORIZONTAL_MARGIN;
    let max_left = viewport.offset_left + viewport.width - bubble_w - BUBBLE_HORIZONTAL_MARGIN;
    let screen_left = unclamped_left.max(min_left).min(min_left.max(max_left));

    let unclamped_top = anchor_top + BUBBLE_VERTICAL_GAP;
    let min_top = viewport.offset_top + BUBBLE_VERTICAL_GAP;
    let max_top = viewport.offset_top + viewport.height - bubble_h - BUBBLE_VERTICAL_GAP;
    let screen_top = unclamped_top.max(min_top).min(min_top.max(max_top));

    convert_screen_to_layout(
        Point {
            x: screen_left,
            y: screen_top,
        },
        transform,
    )
}
