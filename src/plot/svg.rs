//! SVG Builder
//!
//! Minimal fluent API for the diagnostic charts.

/// Escape text content and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Text anchoring for labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

/// SVG element types
#[derive(Debug, Clone, PartialEq)]
pub enum SvgElement {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: String,
        opacity: f64,
        stroke: Option<String>,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        fill: String,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke: String,
        width: f64,
    },
    Text {
        x: f64,
        y: f64,
        content: String,
        size: f64,
        anchor: Anchor,
    },
    Group {
        id: String,
        elements: Vec<SvgElement>,
    },
}

impl SvgElement {
    /// Render to SVG string
    pub fn to_svg(&self) -> String {
        match self {
            Self::Rect {
                x,
                y,
                width,
                height,
                fill,
                opacity,
                stroke,
            } => {
                let stroke = stroke
                    .as_ref()
                    .map(|s| format!(" stroke=\"{}\" stroke-width=\"1\"", s))
                    .unwrap_or_default();
                format!(
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" fill-opacity=\"{:.2}\"{}/>",
                    x, y, width, height, fill, opacity, stroke
                )
            }
            Self::Circle { cx, cy, r, fill } => format!(
                "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\"/>",
                cx, cy, r, fill
            ),
            Self::Line {
                x1,
                y1,
                x2,
                y2,
                stroke,
                width,
            } => format!(
                "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"{:.1}\"/>",
                x1, y1, x2, y2, stroke, width
            ),
            Self::Text {
                x,
                y,
                content,
                size,
                anchor,
            } => format!(
                "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"sans-serif\" font-size=\"{:.0}\" text-anchor=\"{}\">{}</text>",
                x,
                y,
                size,
                anchor.as_str(),
                escape(content)
            ),
            Self::Group { id, elements } => {
                let children: String = elements.iter().map(|e| e.to_svg()).collect();
                format!("<g id=\"{}\">{}</g>", escape(id), children)
            }
        }
    }
}

/// SVG document builder
#[derive(Debug, Clone)]
pub struct SvgBuilder {
    width: f64,
    height: f64,
    title: Option<String>,
    background: String,
    elements: Vec<SvgElement>,
}

impl SvgBuilder {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            title: None,
            background: "#FFFFFF".to_string(),
            elements: Vec::new(),
        }
    }

    /// Set the title
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Add a filled rectangle
    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64, fill: &str, opacity: f64) -> Self {
        self.elements.push(SvgElement::Rect {
            x,
            y,
            width,
            height,
            fill: fill.to_string(),
            opacity,
            stroke: None,
        });
        self
    }

    /// Add an outlined rectangle
    pub fn rect_outlined(mut self, x: f64, y: f64, width: f64, height: f64, stroke: &str) -> Self {
        self.elements.push(SvgElement::Rect {
            x,
            y,
            width,
            height,
            fill: "none".to_string(),
            opacity: 1.0,
            stroke: Some(stroke.to_string()),
        });
        self
    }

    /// Add a circle
    pub fn circle(mut self, cx: f64, cy: f64, r: f64, fill: &str) -> Self {
        self.elements.push(SvgElement::Circle {
            cx,
            cy,
            r,
            fill: fill.to_string(),
        });
        self
    }

    /// Add a line
    pub fn line(mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str, width: f64) -> Self {
        self.elements.push(SvgElement::Line {
            x1,
            y1,
            x2,
            y2,
            stroke: stroke.to_string(),
            width,
        });
        self
    }

    /// Add text
    pub fn text(mut self, x: f64, y: f64, content: &str, size: f64, anchor: Anchor) -> Self {
        self.elements.push(SvgElement::Text {
            x,
            y,
            content: content.to_string(),
            size,
            anchor,
        });
        self
    }

    /// Add a group of elements
    pub fn group(mut self, id: &str, elements: Vec<SvgElement>) -> Self {
        self.elements.push(SvgElement::Group {
            id: id.to_string(),
            elements,
        });
        self
    }

    /// Build the SVG document
    pub fn build(self) -> String {
        let mut svg = String::new();
        svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {w} {h}\" width=\"{w}\" height=\"{h}\">\n",
            w = self.width,
            h = self.height
        ));
        if let Some(title) = &self.title {
            svg.push_str(&format!("  <title>{}</title>\n", escape(title)));
        }
        svg.push_str(&format!(
            "  <rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n",
            self.background
        ));
        for element in &self.elements {
            svg.push_str(&format!("  {}\n", element.to_svg()));
        }
        svg.push_str("</svg>\n");
        svg
    }
}
