//! Deterministic type colors.
//!
//! Ranks map to a 26 color alphabet palette. Past the end of the palette the
//! colors repeat with their hue rotated a little further on every lap, so
//! hundreds of types stay distinguishable.

/// Green-Armytage's 26 color alphabet.
pub const PALETTE: [&str; 26] = [
	"#F0A3FF", "#0075DC", "#993F00", "#4C005C", "#191919", "#005C31", "#2BCE48", "#FFCC99",
	"#808080", "#94FFB5", "#8F7C00", "#9DCC00", "#C20088", "#003380", "#FFA405", "#FFA8BB",
	"#426600", "#FF0010", "#5EF1F2", "#00998F", "#E0FF66", "#740AFF", "#990000", "#FFFF80",
	"#FFE100", "#FF5005",
];

/// Hue rotation per lap around the palette, in degrees.
pub const HUE_STEP: f64 = 50.0;

/// Color for the type ranked `index` (0 = most frequent).
pub fn color_for_rank(index: usize) -> String {
	let base = PALETTE[index % PALETTE.len()];
	if index < PALETTE.len() {
		return base.to_string();
	}
	shift_hue(base, -hue_shift(index)).unwrap_or_else(|| base.to_string())
}

/// Total hue rotation (degrees, positive) applied to rank `index`.
///
/// Zero inside the palette. Once the accumulated shift passes a full turn an
/// extra correction keeps later laps from landing on earlier hues.
pub fn hue_shift(index: usize) -> f64 {
	if index < PALETTE.len() {
		return 0.0;
	}
	// floor, not ceil: rank 26 starts the first lap and gets one step
	let cycles = (index / PALETTE.len()) as f64;
	let total = cycles * HUE_STEP;
	let hue_cycles = (total / 360.0).floor();
	total + hue_cycles * (HUE_STEP / (hue_cycles + 1.0))
}

/// Rotates the hue of a `#RRGGBB` color by `degrees`.
pub fn shift_hue(hex: &str, degrees: f64) -> Option<String> {
	let (r, g, b) = parse_hex(hex)?;
	let (h, s, l) = rgb_to_hsl(r, g, b);
	let (r, g, b) = hsl_to_rgb((h + degrees).rem_euclid(360.0), s, l);
	Some(format!("#{r:02X}{g:02X}{b:02X}"))
}

/// Splits `#RRGGBB` into channels.
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
	let digits = hex.strip_prefix('#')?;
	if digits.len() != 6 || !digits.is_ascii() {
		return None;
	}
	let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
	Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Hue in degrees, saturation and lightness in `0..=1`.
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
	let (r, g, b) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
	let max = r.max(g).max(b);
	let min = r.min(g).min(b);
	let l = (max + min) / 2.0;
	let d = max - min;
	if d == 0.0 {
		return (0.0, 0.0, l);
	}
	let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
	let h = if max == r {
		(g - b) / d + if g < b { 6.0 } else { 0.0 }
	} else if max == g {
		(b - r) / d + 2.0
	} else {
		(r - g) / d + 4.0
	};
	(h * 60.0, s, l)
}

/// Inverse of [`rgb_to_hsl`].
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
	let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
	let hp = h / 60.0;
	let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
	let (r1, g1, b1) = match hp as u32 {
		0 => (c, x, 0.0),
		1 => (x, c, 0.0),
		2 => (0.0, c, x),
		3 => (0.0, x, c),
		4 => (x, 0.0, c),
		_ => (c, 0.0, x),
	};
	let m = l - c / 2.0;
	let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
	(channel(r1), channel(g1), channel(b1))
}
