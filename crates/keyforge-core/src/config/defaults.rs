//! Default configuration values

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "keyforge.yaml";

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "keyforge.toml";

/// Alternative configuration file name
pub const ALT_CONFIG_FILE: &str = ".keyforge.yaml";

/// Working tree location when nothing else is configured
pub const DEFAULT_QMK_HOME: &str = "qmk_firmware";

/// Declarative task files
pub const DEFAULT_CONFIG_GLOB: &str = "**/keyboards.yml";

pub const DEFAULT_COMPILER: &str = "qmk";

/// Placeholder keymap for keyboards found by scanning
pub const DEFAULT_SENTINEL_KEYMAP: &str = "via";

/// Conventional keymap every keyboard ships
pub const DEFAULT_FALLBACK_KEYMAP: &str = "default";

/// Firmware formats the compiler may leave behind
pub const DEFAULT_ARTIFACT_EXTENSIONS: &[&str] = &["hex", "bin", "uf2"];

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_YAML,
        DEFAULT_CONFIG_TOML,
        ALT_CONFIG_FILE,
        ".keyforge.toml",
    ]
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# keyforge configuration

qmk_home: qmk_firmware
family: qmk

sources:
  declarative: true
  config_glob: "**/keyboards.yml"
  auto_detect: false

build:
  compiler: qmk
  sentinel_keymap: via
  fallback_keymap: default
  artifact_extensions: [hex, bin, uf2]
  sync_submodules: false
"#;
