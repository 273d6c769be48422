static BRIDGE_BOOTSTRAP_TEMPLATE: &str = include_str!("bridge_bootstrap.js");
const CLIENT_ID_PLACEHOLDER: &str = "{CLIENT_ID_JSON}";

pub fn bootstrap_script(client_id: &str) -> String {
    let client_id_json = serde_json::to_string(client_id).unwrap_or_else(|_| "\"\"".to_string());
    BRIDGE_BOOTSTRAP_TEMPLATE.replace(CLIENT_ID_PLACEHOLDER, &client_id_json)
}
