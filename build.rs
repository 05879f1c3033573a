fn main() {
    println!("cargo:rerun-if-env-changed=GREENHOUSE_CONFIG_JSON");
    println!("cargo:rerun-if-env-changed=GREENHOUSE_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=GREENHOUSE_WIFI_PASSWORD");
    println!("cargo:rerun-if-env-changed=GREENHOUSE_API_KEY");
    println!("cargo:rerun-if-env-changed=GREENHOUSE_TALKBACK_KEY");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
