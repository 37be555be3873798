use serde::Serialize;

// Resultado de alternar el like de un usuario sobre un artículo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_num: i32,
}
