/// Default TOML config content with comments.
pub(super) fn default_config_toml() -> &'static str {
    r#"# Lobby Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[voice]
# talk_window_secs = 0.25  # (0, 10]
# volume = 1.0             # 0.0-4.0
# enabled_on_join = false

[session]
# update_interval_secs = 1.0  # 0.05-3600
# light_mode = false

[chat]
# history_size = 100         # 1-10000
# max_message_bytes = 4096   # 1-65536

[logging]
# level = "INFO"           # DEBUG, INFO, WARNING, ERROR
"#
}
