/// Naming defaults used when a [`Portfolio`](crate::portfolio::Portfolio)
/// creates entities on the caller's behalf.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioConfig {
    /// Prefix of generated sketch names ("Untitled 1", "Untitled 2", ...).
    /// Default: **"Untitled"**.
    pub sketch_name_prefix: String,

    /// Name of the style every new portfolio starts with. Default: **"Default"**.
    pub default_style_name: String,

    /// Name given to colors added without one. Default: **"Color"**.
    pub color_name: String,

    /// Name given to gradients added without one. Default: **"Gradient"**.
    pub gradient_name: String,

    /// Name given to shared styles added without one. Default: **"Style"**.
    pub style_name: String,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            sketch_name_prefix: "Untitled".to_string(),
            default_style_name: "Default".to_string(),
            color_name: "Color".to_string(),
            gradient_name: "Gradient".to_string(),
            style_name: "Style".to_string(),
        }
    }
}
