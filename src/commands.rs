//! Operator chat commands.
//!
//! The chat platform is reached through the [`ChatChannel`] capability: a gateway adapter
//! turns incoming messages into an [`Invocation`], calls [`dispatch`], and implements
//! `send`/`edit` for the channel the message came from. Commands use the `!!` prefix and
//! require the manage-guild permission.

// self
use crate::{
	_prelude::*,
	flows::{Broker, ProgressFuture, ProgressSink, ReconcileReport, ReconciliationProgress, RefreshReport},
	http::ProviderHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind},
};

/// Prefix every operator command starts with.
pub const COMMAND_PREFIX: &str = "!!";

const BLUE: u32 = 0x3498DB;
const GREEN: u32 = 0x2ECC71;

/// Boxed future returned by [`ChatChannel`] methods.
pub type ChatFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ChatError>> + 'a + Send>>;

/// Errors raised while parsing or running a command.
#[derive(Debug, ThisError)]
pub enum CommandError {
	/// The command name is not recognized.
	#[error("Unknown command `{name}`.")]
	UnknownCommand {
		/// Name after the prefix.
		name: String,
	},
	/// A required argument was not supplied.
	#[error("Command `{command}` requires the `{argument}` argument.")]
	MissingArgument {
		/// Command name.
		command: &'static str,
		/// Argument name.
		argument: &'static str,
	},
	/// The verification URL could not be parsed.
	#[error("Verification URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The invoker lacks the manage-guild permission.
	#[error("Invoker lacks the manage-guild permission.")]
	PermissionDenied,
	/// A broker flow failed.
	#[error(transparent)]
	Broker(#[from] Error),
	/// The chat platform rejected a send or edit.
	#[error(transparent)]
	Chat(#[from] ChatError),
}

/// Failure reported by a [`ChatChannel`] implementation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Chat platform error: {message}.")]
pub struct ChatError {
	/// Human-readable error payload.
	pub message: String,
}
impl ChatError {
	/// Creates a chat error from any message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// Identifier of a message posted through a [`ChatChannel`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

/// Rich embed attached to a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Embed {
	/// Embed title.
	pub title: String,
	/// Embed body.
	pub description: String,
	/// RGB accent color.
	pub color: u32,
}

/// Button that opens a URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkButton {
	/// Button label.
	pub label: String,
	/// Target URL.
	pub url: Url,
}

/// Message posted or edited through a [`ChatChannel`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
	/// Plain text content.
	pub content: Option<String>,
	/// Optional embed.
	pub embed: Option<Embed>,
	/// Link buttons rendered under the message.
	pub buttons: Vec<LinkButton>,
}
impl OutgoingMessage {
	/// Plain text message.
	pub fn text(content: impl Into<String>) -> Self {
		Self { content: Some(content.into()), ..Default::default() }
	}

	/// Message carrying only an embed.
	pub fn embed(embed: Embed) -> Self {
		Self { embed: Some(embed), ..Default::default() }
	}

	/// Adds a link button.
	pub fn with_button(mut self, button: LinkButton) -> Self {
		self.buttons.push(button);

		self
	}
}

/// Channel the command was issued in.
pub trait ChatChannel: Send + Sync {
	/// Posts a new message and returns its id.
	fn send(&self, message: OutgoingMessage) -> ChatFuture<'_, MessageId>;

	/// Replaces the content of a previously posted message.
	fn edit<'a>(&'a self, id: &'a MessageId, message: OutgoingMessage) -> ChatFuture<'a, ()>;
}

/// Parsed operator command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
	/// Posts the verification prompt pointing at `url`.
	Verify {
		/// Where the button leads.
		url: Url,
	},
	/// Joins every stored user missing from the guild.
	JoinAll,
	/// Runs [`Command::JoinAll`], then refreshes every stored record.
	RefreshAll,
}
impl Command {
	/// Parses a chat message; returns `Ok(None)` when it does not carry the prefix.
	pub fn parse(content: &str) -> Result<Option<Self>, CommandError> {
		let Some(body) = content.trim_start().strip_prefix(COMMAND_PREFIX) else {
			return Ok(None);
		};
		let mut parts = body.split_whitespace();
		let name = parts.next().unwrap_or_default();
		let command = match name {
			"verify" => {
				let raw = parts
					.next()
					.ok_or(CommandError::MissingArgument { command: "verify", argument: "url" })?;
				let url = Url::parse(raw).map_err(|source| CommandError::InvalidUrl { source })?;

				Command::Verify { url }
			},
			"join_all" => Command::JoinAll,
			"refresh_all" => Command::RefreshAll,
			_ => return Err(CommandError::UnknownCommand { name: name.to_owned() }),
		};

		Ok(Some(command))
	}
}

/// An incoming chat message as seen by the dispatcher.
#[derive(Clone, Copy, Debug)]
pub struct Invocation<'a> {
	/// Raw message text.
	pub content: &'a str,
	/// Whether the author holds the manage-guild permission.
	pub can_manage_guild: bool,
}

/// Summary of a dispatched command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandReport {
	/// The verification prompt was posted.
	Verify,
	/// A reconciliation run finished.
	JoinAll(ReconcileReport),
	/// A reconciliation run finished, followed by a refresh batch.
	///
	/// The refresh tally is `None` when the batch could not list the store.
	RefreshAll(ReconcileReport, Option<RefreshReport>),
}

/// Parses and runs one chat message.
///
/// Returns `Ok(None)` for messages that are not commands. Unauthorized invokers get a
/// reply and [`CommandError::PermissionDenied`].
pub async fn dispatch<C, M>(
	broker: &Broker<C, M>,
	channel: &dyn ChatChannel,
	invocation: Invocation<'_>,
) -> Result<Option<CommandReport>, CommandError>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let Some(command) = Command::parse(invocation.content)? else {
		return Ok(None);
	};

	if !invocation.can_manage_guild {
		channel
			.send(OutgoingMessage::text(
				"You are missing Manage Server permission(s) to run this command.",
			))
			.await?;

		return Err(CommandError::PermissionDenied);
	}

	let report = match command {
		Command::Verify { url } => {
			channel.send(verification_prompt(url)).await?;

			CommandReport::Verify
		},
		Command::JoinAll => CommandReport::JoinAll(join_all(broker, channel).await?),
		Command::RefreshAll => {
			let joined = join_all(broker, channel).await?;
			let refreshed = broker
				.refresh_all()
				.await
				.inspect_err(|err| obs::record_batch_failure(FlowKind::RefreshAll, err))
				.ok();

			channel.send(OutgoingMessage::text("Completed refreshing members")).await?;

			CommandReport::RefreshAll(joined, refreshed)
		},
	};

	Ok(Some(report))
}

/// Verification prompt with a single link button.
pub fn verification_prompt(url: Url) -> OutgoingMessage {
	OutgoingMessage::embed(Embed {
		title: "Verification System".into(),
		description: "Click the button below to verify your account".into(),
		color: BLUE,
	})
	.with_button(LinkButton { label: "Verify".into(), url })
}

async fn join_all<C, M>(
	broker: &Broker<C, M>,
	channel: &dyn ChatChannel,
) -> Result<ReconcileReport, CommandError>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let plan = broker.plan_join_all().await?;

	channel
		.send(OutgoingMessage::text(format!(
			"Guild members: {}\nDatabase members: {}\nMembers to join: {}",
			plan.guild_members,
			plan.stored_members,
			plan.plan.len()
		)))
		.await?;

	let message = channel.send(progress_message("Joining Members", &Default::default())).await?;
	let sink = ProgressMessage { channel, message };
	let report = broker.execute_plan(&plan.plan, &sink).await;

	channel.send(OutgoingMessage::text("Completed joining members")).await?;

	Ok(report)
}

fn progress_message(title: &str, progress: &ReconciliationProgress) -> OutgoingMessage {
	let description =
		progress.joined().iter().map(|user| user.as_ref()).collect::<Vec<_>>().join("\n");

	OutgoingMessage::embed(Embed { title: title.into(), description, color: GREEN })
}

/// Progress sink that keeps one posted message in sync with the run.
pub struct ProgressMessage<'a> {
	/// Channel the message lives in.
	pub channel: &'a dyn ChatChannel,
	/// Message being edited.
	pub message: MessageId,
}
impl ProgressSink for ProgressMessage<'_> {
	fn on_joined<'a>(&'a self, progress: &'a ReconciliationProgress) -> ProgressFuture<'a> {
		Box::pin(async move {
			let update = progress_message("Joining members...", progress);

			// A failed edit only costs the live view; the run continues.
			if let Err(err) = self.channel.edit(&self.message, update).await {
				#[cfg(feature = "tracing")]
				tracing::warn!(error = %err, "progress edit failed");
				#[cfg(not(feature = "tracing"))]
				let _ = err;
			}
		})
	}
}
