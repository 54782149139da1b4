//! Shared setup for workflow and HTTP tests: employee Erin, managed by Mona,
//! with HR officers Ali and Bea.

use std::sync::Arc;

use actix_web::middleware::from_fn;
use actix_web::web;
use chrono::NaiveDate;

use crate::api::view_requests::view_requests;
use crate::auth::middleware::auth_middleware;
use crate::config::Config;
use crate::mail::memory::InMemoryMailStore;
use crate::model::leave_request::LeaveRequest;
use crate::model::role::Role;
use crate::repository::memory::InMemoryRepository;
use crate::report::render::VIEW_PATH;
use crate::repository::{DirectoryRepository, NewEmployee};
use crate::routes::api_routes;
use crate::utils::token::TokenSigner;
use crate::workflow::guard::Actor;
use crate::workflow::notifier::Notifier;
use crate::workflow::service::{LeaveService, NewLeave};

pub struct Fixture {
    pub config: Config,
    pub repo: Arc<InMemoryRepository>,
    pub mail: Arc<InMemoryMailStore>,
    pub service: Arc<LeaveService>,
    pub signer: TokenSigner,
    pub mona_id: u64,
    pub ali_id: u64,
    pub bea_id: u64,
    pub erin_id: u64,
}

fn employee(name: &str, user_id: u64, manager_id: Option<u64>, officers: Vec<u64>) -> NewEmployee {
    NewEmployee {
        name: name.to_string(),
        department_id: Some(Fixture::ENGINEERING),
        manager_id,
        user_id: Some(user_id),
        work_email: Some(format!("{}@corp.test", name.to_lowercase())),
        personal_email: None,
        hr_officer_ids: officers,
    }
}

impl Fixture {
    // user ids
    pub const MONA: u64 = 100;
    pub const ALI: u64 = 200;
    pub const BEA: u64 = 300;
    pub const ERIN: u64 = 400;
    pub const HANA: u64 = 500;

    pub const ENGINEERING: u64 = 1;
    pub const ANNUAL: u64 = 1;

    pub async fn new() -> Self {
        let config = Config::for_tests();
        let repo = Arc::new(InMemoryRepository::default());
        repo.add_user(Self::MONA, "Mona", Some("mona@corp.test"), true);
        repo.add_user(Self::ALI, "Ali", Some("ali@corp.test"), true);
        repo.add_user(Self::BEA, "Bea", Some("bea@corp.test"), true);
        repo.add_user(Self::ERIN, "Erin", Some("erin@corp.test"), true);
        repo.add_user(Self::HANA, "Hana", Some("hana@corp.test"), true);
        repo.add_department(Self::ENGINEERING, "Engineering");
        repo.add_leave_type(Self::ANNUAL, "Annual");

        let mona = repo.insert_employee(employee("Mona", Self::MONA, None, vec![])).await.unwrap();
        let ali = repo.insert_employee(employee("Ali", Self::ALI, None, vec![])).await.unwrap();
        let bea = repo.insert_employee(employee("Bea", Self::BEA, None, vec![])).await.unwrap();
        let erin = repo
            .insert_employee(employee("Erin", Self::ERIN, Some(mona.id), vec![ali.id, bea.id]))
            .await
            .unwrap();

        let mail = Arc::new(InMemoryMailStore::default());
        let signer = TokenSigner::new(&config.approval_secret);
        let notifier = Notifier::new(
            repo.clone(),
            mail.clone(),
            mail.clone(),
            signer.clone(),
            config.mail_from.clone(),
            config.public_base_url.clone(),
        );
        let service = Arc::new(LeaveService::new(
            repo.clone(),
            repo.clone(),
            notifier,
            signer.clone(),
        ));

        Self {
            config,
            repo,
            mail,
            service,
            signer,
            mona_id: mona.id,
            ali_id: ali.id,
            bea_id: bea.id,
            erin_id: erin.id,
        }
    }

    fn employee_actor(user_id: u64, employee_id: u64) -> Actor {
        Actor {
            user_id,
            role: Role::Employee,
            employee_id: Some(employee_id),
        }
    }

    pub fn erin(&self) -> Actor {
        Self::employee_actor(Self::ERIN, self.erin_id)
    }

    pub fn mona(&self) -> Actor {
        Self::employee_actor(Self::MONA, self.mona_id)
    }

    pub fn ali(&self) -> Actor {
        Self::employee_actor(Self::ALI, self.ali_id)
    }

    pub fn bea(&self) -> Actor {
        Self::employee_actor(Self::BEA, self.bea_id)
    }

    pub fn hr(&self) -> Actor {
        Actor {
            user_id: Self::HANA,
            role: Role::Hr,
            employee_id: None,
        }
    }

    /// Same endpoints as the server, without the rate limiters.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.config.clone()))
            .app_data(web::Data::from(self.service.clone()))
            .route(VIEW_PATH, web::get().to(view_requests))
            .service(
                web::scope(&self.config.api_prefix)
                    .wrap(from_fn(auth_middleware))
                    .configure(api_routes),
            );
    }

    /// Bearer header value for `actor`.
    pub fn bearer(&self, actor: &Actor) -> String {
        let token = crate::auth::jwt::generate_access_token(
            actor.user_id,
            "tester",
            actor.role.id(),
            actor.employee_id,
            &self.config.jwt_secret,
            600,
        );
        format!("Bearer {token}")
    }

    pub async fn create_leave_for_erin(&self) -> LeaveRequest {
        self.service
            .create_leave(
                &self.erin(),
                NewLeave {
                    employee_id: None,
                    leave_type_id: Self::ANNUAL,
                    date_from: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                    date_to: NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
                    number_of_days: None,
                    description: Some("Family trip".into()),
                },
            )
            .await
            .unwrap()
    }

    /// A leave already in `to_approve`, with the submit notice drained.
    pub async fn submitted_leave(&self) -> LeaveRequest {
        let leave = self.create_leave_for_erin().await;
        let leave = self.service.submit(&self.erin(), leave.id).await.unwrap();
        self.mail.take_sent();
        leave
    }
}
