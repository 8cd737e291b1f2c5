use geoauth_core::flow::{Field, UserAction};

use crate::commands::common::{fill, require_signed_in, resumed_controller, submit, ProfileContext};
use crate::error::CliError;

pub async fn run_profile(
    context: &ProfileContext,
    display_name: &str,
    avatar_url: Option<&str>,
) -> Result<(), CliError> {
    let mut controller = resumed_controller(context).await?;
    require_signed_in(controller.state())?;

    submit(&mut controller, UserAction::EditProfile).await?;
    fill(&mut controller, Field::DisplayName, display_name).await?;
    if let Some(url) = avatar_url {
        fill(&mut controller, Field::AvatarUrl, url).await?;
    }
    submit(&mut controller, UserAction::SaveProfile).await
}

pub async fn run_password(context: &ProfileContext, new_password: &str) -> Result<(), CliError> {
    let mut controller = resumed_controller(context).await?;
    require_signed_in(controller.state())?;

    submit(&mut controller, UserAction::ChangePassword).await?;
    fill(&mut controller, Field::NewPassword, new_password).await?;
    submit(&mut controller, UserAction::SavePassword).await
}
