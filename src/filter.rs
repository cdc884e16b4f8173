//! Declarative side of the consumer contract: the SVG filter chain that
//! warps content through a displacement map.
//!
//! The chain reads X displacement from the Red channel and Y displacement
//! from the Blue channel, which is why the generator duplicates the Y
//! encoding across G and B. Chromatic aberration comes from running the
//! displacement three times at slightly different scales and recombining
//! the isolated color channels with a screen blend.

use std::fmt::Write as _;

/// Parameters of the downstream filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChainSpec {
    /// The id of the emitted `<filter>` element.
    pub id: String,
    /// Displacement scale in CSS pixels at full map intensity.
    pub scale: f32,
    /// Per-channel scale delta: red runs at `scale + aberration`, blue at
    /// `scale - aberration`. Zero disables the channel split.
    pub aberration: f32,
    /// Standard deviation of the final softening blur.
    pub blur: f32,
}

impl Default for FilterChainSpec {
    fn default() -> Self {
        Self {
            id: "lensmap-refraction".to_owned(),
            scale: 40.0,
            aberration: 6.0,
            blur: 0.25,
        }
    }
}

impl FilterChainSpec {
    /// Render the `<filter>` element, binding `map_data_url` as the
    /// displacement input texture.
    pub fn filter_markup(&self, map_data_url: &str) -> String {
        let mut out = String::new();
        let id = &self.id;
        let red_scale = self.scale + self.aberration;
        let green_scale = self.scale;
        let blue_scale = self.scale - self.aberration;

        let _ = writeln!(
            out,
            r#"<filter id="{id}" x="0" y="0" width="100%" height="100%" color-interpolation-filters="sRGB">"#
        );
        let _ = writeln!(
            out,
            r#"  <feImage href="{map_data_url}" x="0" y="0" width="100%" height="100%" preserveAspectRatio="none" result="map"/>"#
        );

        for (channel, scale, matrix_row) in [
            ("red", red_scale, 0),
            ("green", green_scale, 1),
            ("blue", blue_scale, 2),
        ] {
            let _ = writeln!(
                out,
                r#"  <feDisplacementMap in="SourceGraphic" in2="map" scale="{scale}" xChannelSelector="R" yChannelSelector="B" result="disp_{channel}"/>"#
            );
            let _ = writeln!(
                out,
                r#"  <feColorMatrix in="disp_{channel}" type="matrix" values="{}" result="{channel}"/>"#,
                channel_isolation_matrix(matrix_row)
            );
        }

        let _ = writeln!(
            out,
            r#"  <feBlend in="red" in2="green" mode="screen" result="red_green"/>"#
        );
        let _ = writeln!(
            out,
            r#"  <feBlend in="red_green" in2="blue" mode="screen" result="aberrated"/>"#
        );
        let _ = writeln!(
            out,
            r#"  <feGaussianBlur in="aberrated" stdDeviation="{}"/>"#,
            self.blur
        );
        out.push_str("</filter>");
        out
    }

    /// Render a standalone SVG document holding the filter in `<defs>`, so
    /// the output file can be referenced as `url(#id)` directly.
    pub fn svg_document(&self, map_data_url: &str) -> String {
        let filter = self.filter_markup(map_data_url);
        let mut out = String::new();
        out.push_str(r#"<svg xmlns="http://www.w3.org/2000/svg">"#);
        out.push('\n');
        out.push_str("<defs>\n");
        out.push_str(&filter);
        out.push_str("\n</defs>\n</svg>\n");
        out
    }
}

/// A matrix that keeps one color row and the alpha row, zeroing the rest.
fn channel_isolation_matrix(row: usize) -> String {
    let mut values = Vec::with_capacity(20);
    for r in 0..4 {
        for c in 0..5 {
            let keep = (r == row && c == row) || (r == 3 && c == 3);
            values.push(if keep { "1" } else { "0" });
        }
    }
    values.join(" ")
}
