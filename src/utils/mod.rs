pub mod load_toml;
