//! [`Booking`]-related definitions.

use common::{DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{
    graphql_object, GraphQLEnum, GraphQLInputObject, GraphQLObject,
    GraphQLScalar,
};
use service::{domain, read};
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A reservation of a parking slot.
///
/// Wraps a [`read::booking::Summary`], so the values derived from the current
/// time are fixed at the moment the [`Booking`] was loaded.
#[derive(Clone, Debug, From)]
pub struct Booking(read::booking::Summary);

impl Booking {
    /// Returns the underlying [`domain::Booking`].
    fn booking(&self) -> &domain::Booking {
        &self.0.booking
    }
}

impl From<domain::Booking> for Booking {
    fn from(booking: domain::Booking) -> Self {
        Self(read::booking::Summary::at(booking, DateTime::now()))
    }
}

/// A reservation of a parking slot.
#[graphql_object(context = Context)]
impl Booking {
    /// Unique identifier of this `Booking`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.booking().id.into()
    }

    /// Short token to be shown as a QR code at the `Lot` gate.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.qrToken",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn qr_token(&self) -> QrToken {
        self.booking().qr_token.clone().into()
    }

    /// ID of the `User` who made this `Booking`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.userId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn user_id(&self) -> api::user::Id {
        self.booking().user_id.into()
    }

    /// `Lot` this `Booking` is made in.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.lot",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn lot(&self) -> api::Lot {
        #[expect(
            unsafe_code,
            reason = "`Booking` is never stored without its `Lot`"
        )]
        unsafe {
            api::Lot::new_unchecked(self.booking().lot_id)
        }
    }

    /// `Vehicle` parked by this `Booking`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.vehicle",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn vehicle(&self) -> Vehicle {
        self.booking().vehicle.clone().into()
    }

    /// Number of hours initially booked.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.duration",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn duration(&self) -> i32 {
        self.booking().duration.get().into()
    }

    /// Number of hours booked including all the extensions.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.totalHours",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn total_hours(&self, ctx: &Context) -> Result<i32, Error> {
        i32::try_from(self.booking().total_hours())
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// `DateTime` when this `Booking` starts.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.startsAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn starts_at(&self) -> DateTime {
        self.booking().starts_at.coerce()
    }

    /// `DateTime` when this `Booking` ends, extensions included.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.endsAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn ends_at(&self) -> DateTime {
        self.booking().ends_at().coerce()
    }

    /// Price of a single hour fixed at the moment of booking.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.hourlyRate",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn hourly_rate(&self) -> Money {
        self.booking().hourly_rate
    }

    /// Total amount charged for this `Booking`, extensions included.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.amount",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn amount(&self) -> Money {
        self.booking().amount()
    }

    /// Extensions of this `Booking` in the order they were made.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.extensions",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn extensions(&self) -> Vec<Extension> {
        self.booking()
            .extensions
            .iter()
            .copied()
            .map(Into::into)
            .collect()
    }

    /// Lifecycle status of this `Booking`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn status(&self) -> Status {
        self.booking().status.into()
    }

    /// Payment status of this `Booking`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.paymentStatus",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn payment_status(&self) -> PaymentStatus {
        self.booking().payment_status.into()
    }

    /// Human-facing status of this `Booking` at the moment it was loaded.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.displayStatus",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn display_status(&self) -> DisplayStatus {
        self.0.display_status.into()
    }

    /// Whole minutes left until this `Booking` ends.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.remainingMinutes",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn remaining_minutes(&self, ctx: &Context) -> Result<i32, Error> {
        i32::try_from(self.0.remaining_minutes)
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// `DateTime` when the `Vehicle` entered the `Lot`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.enteredAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn entered_at(&self) -> Option<DateTime> {
        self.booking().entered_at.map(|at| at.coerce())
    }

    /// `DateTime` when the `Vehicle` left the `Lot`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.exitedAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn exited_at(&self) -> Option<DateTime> {
        self.booking().exited_at.map(|at| at.coerce())
    }

    /// Cancellation details, if this `Booking` was cancelled.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.cancellation",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn cancellation(&self) -> Option<Cancellation> {
        self.booking().cancellation.clone().map(Into::into)
    }

    /// Rating left for this `Booking`, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.rating",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn rating(&self) -> Option<Rating> {
        self.booking().rating.clone().map(Into::into)
    }

    /// `DateTime` when this `Booking` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn created_at(&self) -> DateTime {
        self.booking().created_at.coerce()
    }
}

/// Unique identifier of a `Booking`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::booking::Id)]
#[into(domain::booking::Id)]
#[graphql(name = "BookingId", transparent)]
pub struct Id(Uuid);

/// Short token of a `Booking` checked at the `Lot` gate.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "BookingQrToken",
    with = scalar::Via::<domain::booking::QrToken>,
)]
pub struct QrToken(domain::booking::QrToken);

/// Free-form text, such as a cancellation reason or a rating comment.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "BookingNote", with = scalar::Via::<domain::booking::Note>)]
pub struct Note(domain::booking::Note);

/// Name of a `Vehicle` given by its owner.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "VehicleName",
    with = scalar::Via::<domain::booking::vehicle::Name>,
)]
pub struct VehicleName(domain::booking::vehicle::Name);

/// Registration plate number of a `Vehicle`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "VehiclePlate",
    with = scalar::Via::<domain::booking::vehicle::Plate>,
)]
pub struct VehiclePlate(domain::booking::vehicle::Plate);

/// Vehicle parked by a `Booking`.
#[derive(Clone, Debug, GraphQLObject)]
pub struct Vehicle {
    /// Name of this `Vehicle`.
    pub name: VehicleName,

    /// Registration plate number of this `Vehicle`.
    pub plate: VehiclePlate,

    /// Kind of this `Vehicle`.
    pub kind: VehicleKind,
}

impl From<domain::booking::Vehicle> for Vehicle {
    fn from(vehicle: domain::booking::Vehicle) -> Self {
        let domain::booking::Vehicle { name, plate, kind } = vehicle;
        Self {
            name: name.into(),
            plate: plate.into(),
            kind: kind.into(),
        }
    }
}

/// Vehicle to be parked by a new `Booking`.
#[derive(Clone, Debug, GraphQLInputObject)]
pub struct VehicleInput {
    /// Name of the `Vehicle`.
    pub name: VehicleName,

    /// Registration plate number of the `Vehicle`.
    pub plate: VehiclePlate,

    /// Kind of the `Vehicle`.
    pub kind: VehicleKind,
}

impl From<VehicleInput> for domain::booking::Vehicle {
    fn from(input: VehicleInput) -> Self {
        let VehicleInput { name, plate, kind } = input;
        Self {
            name: name.into(),
            plate: plate.into(),
            kind: kind.into(),
        }
    }
}

/// Kind of a `Vehicle`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
pub enum VehicleKind {
    /// Passenger car.
    Car,

    /// Motorcycle or scooter.
    Bike,

    /// Sport utility vehicle.
    Suv,

    /// Truck or van.
    Truck,
}

impl From<domain::booking::vehicle::Kind> for VehicleKind {
    fn from(kind: domain::booking::vehicle::Kind) -> Self {
        use domain::booking::vehicle::Kind as K;
        match kind {
            K::Car => Self::Car,
            K::Bike => Self::Bike,
            K::Suv => Self::Suv,
            K::Truck => Self::Truck,
        }
    }
}

impl From<VehicleKind> for domain::booking::vehicle::Kind {
    fn from(kind: VehicleKind) -> Self {
        match kind {
            VehicleKind::Car => Self::Car,
            VehicleKind::Bike => Self::Bike,
            VehicleKind::Suv => Self::Suv,
            VehicleKind::Truck => Self::Truck,
        }
    }
}

/// Prolongation of a `Booking`.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(name = "BookingExtension")]
pub struct Extension {
    /// Number of extra hours.
    pub hours: i32,

    /// Amount charged for the extra hours.
    pub amount: Money,

    /// `DateTime` when this `BookingExtension` was made.
    pub created_at: DateTime,
}

impl From<domain::booking::Extension> for Extension {
    fn from(ext: domain::booking::Extension) -> Self {
        Self {
            hours: ext.hours.get().into(),
            amount: ext.amount,
            created_at: ext.created_at.coerce(),
        }
    }
}

/// Cancellation details of a `Booking`.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(name = "BookingCancellation")]
pub struct Cancellation {
    /// Reason given by the canceller.
    pub reason: Option<Note>,

    /// `DateTime` of the cancellation.
    pub cancelled_at: DateTime,
}

impl From<domain::booking::Cancellation> for Cancellation {
    fn from(cancellation: domain::booking::Cancellation) -> Self {
        Self {
            reason: cancellation.reason.map(Into::into),
            cancelled_at: cancellation.cancelled_at.coerce(),
        }
    }
}

/// Rating left for a completed `Booking`.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(name = "BookingRating")]
pub struct Rating {
    /// Score in `1..=5` range.
    pub score: i32,

    /// Optional comment.
    pub comment: Option<Note>,

    /// `DateTime` when this `BookingRating` was left.
    pub rated_at: DateTime,
}

impl From<domain::booking::Rating> for Rating {
    fn from(rating: domain::booking::Rating) -> Self {
        Self {
            score: rating.score.get().into(),
            comment: rating.comment.map(Into::into),
            rated_at: rating.rated_at.coerce(),
        }
    }
}

/// Lifecycle status of a `Booking`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "BookingStatus")]
pub enum Status {
    /// Awaiting its payment.
    Pending,

    /// Paid and holding a slot.
    Confirmed,

    /// Vehicle has entered the `Lot`.
    Active,

    /// Vehicle has left the `Lot`.
    Completed,

    /// Cancelled by its owner.
    Cancelled,

    /// Ended without the vehicle ever entering.
    Expired,
}

impl From<domain::booking::Status> for Status {
    fn from(status: domain::booking::Status) -> Self {
        use domain::booking::Status as S;
        match status {
            S::Pending => Self::Pending,
            S::Confirmed => Self::Confirmed,
            S::Active => Self::Active,
            S::Completed => Self::Completed,
            S::Cancelled => Self::Cancelled,
            S::Expired => Self::Expired,
        }
    }
}

impl From<Status> for domain::booking::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Pending => Self::Pending,
            Status::Confirmed => Self::Confirmed,
            Status::Active => Self::Active,
            Status::Completed => Self::Completed,
            Status::Cancelled => Self::Cancelled,
            Status::Expired => Self::Expired,
        }
    }
}

/// Payment status of a `Booking`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "BookingPaymentStatus")]
pub enum PaymentStatus {
    /// Payment is not received yet.
    Pending,

    /// Payment is received.
    Paid,

    /// Payment has failed.
    Failed,

    /// Payment was returned to the payer.
    Refunded,
}

impl From<domain::booking::PaymentStatus> for PaymentStatus {
    fn from(status: domain::booking::PaymentStatus) -> Self {
        use domain::booking::PaymentStatus as S;
        match status {
            S::Pending => Self::Pending,
            S::Paid => Self::Paid,
            S::Failed => Self::Failed,
            S::Refunded => Self::Refunded,
        }
    }
}

/// Human-facing status of a `Booking` computed at read time.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "BookingDisplayStatus")]
pub enum DisplayStatus {
    /// Awaiting its payment.
    Pending,

    /// Starts in the future.
    Upcoming,

    /// Window is running and the vehicle hasn't entered.
    Active,

    /// Vehicle is inside the `Lot` within the window.
    Parked,

    /// Window has passed.
    Overdue,

    /// Vehicle has left the `Lot`.
    Completed,

    /// Cancelled by its owner.
    Cancelled,

    /// Ended without the vehicle ever entering.
    Expired,
}

impl From<domain::booking::DisplayStatus> for DisplayStatus {
    fn from(status: domain::booking::DisplayStatus) -> Self {
        use domain::booking::DisplayStatus as S;
        match status {
            S::Pending => Self::Pending,
            S::Upcoming => Self::Upcoming,
            S::Active => Self::Active,
            S::Parked => Self::Parked,
            S::Overdue => Self::Overdue,
            S::Completed => Self::Completed,
            S::Cancelled => Self::Cancelled,
            S::Expired => Self::Expired,
        }
    }
}

pub mod list {
    //! Definitions related to the [`Booking`] list.

    use common::DateTime;
    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::read;

    use super::Booking;
    use crate::{api::scalar, Context};

    /// Case-insensitive fragment of a `VehiclePlate` to search `Booking`s by.
    #[derive(AsRef, Clone, Debug, From, GraphQLScalar, Into)]
    #[graphql(
        name = "PlateSearch",
        with = scalar::Via::<read::booking::list::PlateSearch>,
    )]
    pub struct PlateSearch(pub read::booking::list::PlateSearch);

    /// Cursor for the `Booking` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[graphql(
        name = "BookingListCursor",
        with = scalar::Via::<read::booking::list::Cursor>,
    )]
    pub struct Cursor(pub read::booking::list::Cursor);

    /// Edge in the [`Booking`] list.
    #[derive(Clone, Debug)]
    pub struct Edge {
        /// Cursor of this [`Edge`].
        cursor: Cursor,

        /// [`Booking`] of this [`Edge`].
        node: Booking,
    }

    /// Edge in the `Booking` list.
    #[graphql_object(name = "BookingListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `BookingListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.cursor
        }

        /// Node of this `BookingListEdge`.
        #[must_use]
        pub fn node(&self) -> &Booking {
            &self.node
        }
    }

    /// Connection of the [`Booking`] list.
    #[derive(Clone, Debug)]
    pub struct Connection {
        /// [`Edge`]s of this [`Connection`].
        edges: Vec<Edge>,

        /// Indicator whether there are more [`Booking`]s after this page.
        has_next_page: bool,
    }

    impl From<read::booking::list::Page> for Connection {
        fn from(page: read::booking::list::Page) -> Self {
            let now = DateTime::now();
            Self {
                has_next_page: page.has_next_page,
                edges: page
                    .edges
                    .into_iter()
                    .map(|e| Edge {
                        cursor: e.cursor.into(),
                        node: read::booking::Summary::at(e.node, now).into(),
                    })
                    .collect(),
            }
        }
    }

    /// Connection of the `Booking` list.
    #[graphql_object(name = "BookingListConnection", context = Context)]
    impl Connection {
        /// Edges of this `BookingListConnection`.
        #[must_use]
        pub fn edges(&self) -> &[Edge] {
            &self.edges
        }

        /// Information about the page.
        #[must_use]
        pub fn page_info(&self) -> PageInfo {
            PageInfo {
                has_next_page: self.has_next_page,
                end_cursor: self.edges.last().map(|e| e.cursor),
            }
        }
    }

    /// Information about a [`Connection`] page.
    #[derive(Clone, Copy, Debug)]
    pub struct PageInfo {
        /// Indicator whether there is a next page.
        has_next_page: bool,

        /// End cursor of the page.
        end_cursor: Option<Cursor>,
    }

    /// Information about a `BookingListConnection` page.
    #[graphql_object(name = "BookingListPageInfo", context = Context)]
    impl PageInfo {
        /// Indicator whether there is a next page.
        #[must_use]
        pub fn has_next_page(&self) -> bool {
            self.has_next_page
        }

        /// End cursor of the page, to be passed as `after` for the next one.
        #[must_use]
        pub fn end_cursor(&self) -> Option<Cursor> {
            self.end_cursor
        }
    }
}
