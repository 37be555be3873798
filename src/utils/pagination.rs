use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    // Páginas empiezan en 1; el máximo es el último cuyo OFFSET cabe en un i64
    pub fn new(page: Option<i64>, per_page: i64) -> Self {
        let per_page = per_page.max(1);
        Self {
            page: page.unwrap_or(1).clamp(1, i64::MAX / per_page),
            per_page,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub num_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        let num_pages = ((total + request.per_page - 1) / request.per_page).max(1);
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
            num_pages,
            has_next: request.page < num_pages,
            has_previous: request.page > 1,
        }
    }
}
