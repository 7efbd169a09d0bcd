//! Domain types and models

pub mod lenient;
pub mod remote;
pub mod state;
pub mod user;
pub mod view;

pub use remote::{RemoteDoublePoints, RemotePowerUpState, RemoteStreakShield, RemoteUserState};
pub use state::{
    DailyFocus, DoublePoints, LofiTrackUnlock, Playlist, PowerUpState, StreakShield, Task,
    TaskDifficulty, UserState,
};
pub use user::{AuthUser, OAuthProvider, SignInMethod, SignInOutcome};
pub use view::View;
