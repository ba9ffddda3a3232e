use serde::Serialize;

/// Keeps the last four characters visible.
pub struct Masked;

/// Keeps a short prefix visible, for secrets that are useful to eyeball.
pub struct Truncated;

pub trait MaskPolicy {
    fn mask(value: &str) -> String;
}

impl MaskPolicy for Masked {
    fn mask(value: &str) -> String {
        let len = value.chars().count();
        if len > 4 {
            let tail: String = value.chars().skip(len - 4).collect();
            "*".repeat(len - 4) + &tail
        } else {
            value.to_string()
        }
    }
}

impl MaskPolicy for Truncated {
    fn mask(value: &str) -> String {
        const VISIBLE: usize = 6;
        if value.chars().count() > VISIBLE {
            let head: String = value.chars().take(VISIBLE).collect();
            head + "..."
        } else {
            "***".to_string()
        }
    }
}

/// Return true if a key name likely holds a credential or bearer token.
fn is_secret_key(key: &str) -> bool {
    let k = key.to_lowercase();
    k.contains("token") && !k.contains("type")
        || k.contains("secret")
        || k.contains("password")
        || k == "authorization"
}

/// Return true if a key name likely holds a phone number.
fn is_msisdn_key(key: &str) -> bool {
    let k = key.to_lowercase();
    k.contains("msisdn") || k.contains("phone")
}

pub fn secure_serializable(v: impl Serialize) -> serde_json::Value {
    match serde_json::to_value(v) {
        Ok(value) => secure_value(&value),
        Err(e) => serde_json::Value::String(format!("<unserializable: {e}>")),
    }
}

pub fn secure_value(v: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match v {
        Value::Object(map) => {
            // `{"key": "msisdn", "value": "034..."}` party entries
            let keyed_msisdn = map
                .get("key")
                .and_then(Value::as_str)
                .is_some_and(is_msisdn_key);
            let mut new = serde_json::Map::with_capacity(map.len());
            for (k, val) in map {
                let new_val = match val {
                    Value::String(s) if is_secret_key(k) => Value::String(Truncated::mask(s)),
                    Value::String(s) if is_msisdn_key(k) => Value::String(Masked::mask(s)),
                    Value::String(s) if keyed_msisdn && k == "value" => {
                        Value::String(Masked::mask(s))
                    }
                    Value::Number(n) if is_msisdn_key(k) => {
                        Value::String(Masked::mask(&n.to_string()))
                    }
                    _ => secure_value(val),
                };
                new.insert(k.clone(), new_val);
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(secure_value).collect()),
        other => other.clone(),
    }
}
