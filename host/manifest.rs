use crate::*;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct WebManifest {
    pub short_name: String,
    pub name: String,
    pub description: String,
    pub icons: Vec<ManifestIcon>,
    pub scope: String,
    pub start_url: String,
    pub background_color: String,
    pub theme_color: String,
    pub display: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ManifestIcon {
    pub src: String,
    #[serde(rename = "type")]
    pub mime: &'static str,
    pub sizes: &'static str,
}

impl WebManifest {
    pub fn from_config(config: &ShellConfig) -> Self {
        let mut scope = config.resolve("/");
        if !scope.ends_with('/') {
            scope.push('/');
        }
        let png = |src: &str, sizes| ManifestIcon {
            src: config.resolve(src),
            mime: "image/png",
            sizes,
        };
        let mut icons = vec![
            png(&config.icon.default, "192x192"),
            png(&config.icon.large, "512x512"),
        ];
        if !config.icon.svg.is_empty() {
            icons.push(ManifestIcon {
                src: config.resolve(&config.icon.svg),
                mime: "image/svg+xml",
                sizes: "any",
            });
        }
        Self {
            short_name: config.short_name.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
            icons,
            scope,
            start_url: config.resolve("/"),
            background_color: config.background_color.clone(),
            theme_color: config.theme_color.clone(),
            display: "standalone",
        }
    }
}
