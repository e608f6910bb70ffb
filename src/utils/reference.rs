//! Números de referencia legibles (`REP-20250110-4F7K`, `ORD-...`)

use chrono::Utc;
use rand::Rng;

const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const SUFFIX_LENGTH: usize = 4;

pub const REPAIR_PREFIX: &str = "REP";
pub const ORDER_PREFIX: &str = "ORD";

/// Generar `PREFIJO-YYYYMMDD-XXXX` con sufijo aleatorio.
/// La columna es UNIQUE: ante colisión el repositorio reintenta.
pub fn generate_reference(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();

    format!("{}-{}-{}", prefix, Utc::now().format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_format() {
        let reference = generate_reference(REPAIR_PREFIX);
        let parts: Vec<&str> = reference.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "REP");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), SUFFIX_LENGTH);
        assert!(parts[2].bytes().all(|b| CHARSET.contains(&b)));
    }
}
