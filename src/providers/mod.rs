pub mod supabase;
pub mod util;

pub use supabase::SupabaseGateway;
