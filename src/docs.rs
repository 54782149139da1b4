use crate::api::employee::{CreateEmployee, EmployeeListResponse, UpdateEmployee};
use crate::api::leave_request::{
    CreateLeave, LeaveListResponse, ViewLinkResponse, WriteLeaveState,
};
use crate::api::user::SetUserActive;
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveState};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Approver API",
        version = "1.0.0",
        description = r#"
## Two-stage leave approval

- **Employees** create and submit leave requests.
- The **first approver** is the user of the employee's manager (while active).
- The **second approvers** are the users of the employee's HR officers.
- Every transition is checked against the caller and sends an email notice.
- Approvers get a signed link to a read-only page of their requests.

### 🔐 Security
Endpoints under `/api` need a **JWT Bearer** access token.
Directory changes (employees, user activation) need the **Admin** or **HR** role.
"#,
    ),
    paths(
        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::write_leave_state,
        crate::api::leave_request::submit_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::refuse_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::view_link,
        crate::api::view_requests::view_requests,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::user::set_user_active
    ),
    components(
        schemas(
            LeaveRequest,
            LeaveState,
            CreateLeave,
            WriteLeaveState,
            LeaveListResponse,
            ViewLinkResponse,
            Employee,
            CreateEmployee,
            UpdateEmployee,
            EmployeeListResponse,
            SetUserActive
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request workflow APIs"),
        (name = "Employee", description = "Employee directory APIs"),
        (name = "User", description = "Login account APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
