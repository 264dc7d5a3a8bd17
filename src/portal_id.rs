use rand::Rng;

const ID_LEN: usize = 7;
const ID_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a short, URL-safe, human-shareable portal id: 7 base-36 chars.
/// The shape matches ids minted by earlier deployments, so existing share
/// links keep working. ~36 bits of entropy — collisions with an existing
/// portal are possible and not checked for; a colliding save silently
/// overwrites, which is accepted at this scale.
pub fn generate_portal_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..ID_CHARSET.len());
            ID_CHARSET[idx] as char
        })
        .collect()
}
