pub mod carts;
pub mod categories;
pub mod favorites;
pub mod order_details;
pub mod orders;
pub mod products;
pub mod qr_codes;
pub mod users;

pub use carts::Entity as Carts;
pub use categories::Entity as Categories;
pub use favorites::Entity as Favorites;
pub use order_details::Entity as OrderDetails;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use qr_codes::Entity as QrCodes;
pub use users::Entity as Users;
