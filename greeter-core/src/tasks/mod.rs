pub mod pagination_expiry;
