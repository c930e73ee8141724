//! Authentication, profiles, trial accounts and analytics.

pub mod client;
pub mod identity;
pub mod session;
pub mod supabase;
pub mod trial;

pub use client::{login_error_message, AuthClient, ANALYTICS_TABLE, PROFILES_TABLE};
pub use identity::{
    Filter, IdentityService, ResendRequest, ResendType, SignUpRequest, SignUpResponse,
    UserAttributes,
};
pub use session::{Session, SessionClaims, User};
pub use supabase::SupabaseClient;
pub use trial::{TrialAccount, TrialStatus, TRIAL_TABLE};
